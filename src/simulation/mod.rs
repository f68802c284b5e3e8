mod noise;
mod signal;

pub use noise::{
    AdditiveNoiseConfig, DropoutConfig, JitterConfig, NoiseConfig, apply_noise, gaussian_noise,
    signal_power, white_noise,
};
pub use signal::{
    CLICK_AMPLITUDE, KICK_DURATION_SECS, click_train, interleave, kick_train, mix, pulse_train,
    sine,
};
