/// `FromStr` and `Display` for `clap::ValueEnum` enums, using their
/// kebab-case value names
macro_rules! value_enum_text {
    ($ty:ty, $what:literal) => {
        impl std::str::FromStr for $ty {
            type Err = $crate::error::TempoError;

            fn from_str(s: &str) -> $crate::error::Result<Self> {
                <$ty as clap::ValueEnum>::from_str(s, true).map_err(|_| {
                    $crate::error::TempoError::Config(format!("unknown {} '{}'", $what, s))
                })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match clap::ValueEnum::to_possible_value(self) {
                    Some(value) => f.write_str(value.get_name()),
                    None => write!(f, "{:?}", self),
                }
            }
        }
    };
}

pub mod biquad;
pub mod biquad_design;
pub mod fft;
pub mod filter;
pub mod fir_core;
pub mod fir_design;
pub mod moving_average;
pub mod prototype;
pub mod sliding_max;
pub mod window;

pub use biquad::{BiquadCascade, BiquadCoefficients, BiquadSection};
pub use biquad_design::{FilterCharacteristic, FilterKind, FilterSpec, design_sections};
pub use fft::{Fft, Spectrum, mag_to_db};
pub use filter::Filter;
pub use fir_core::FirFilter;
pub use fir_design::FirResponse;
pub use moving_average::MovingAverage;
pub use sliding_max::SlidingWindowMax;
pub use window::{WindowCache, WindowFunction};
