pub mod capture;
pub mod pcm;
pub mod source;

pub use capture::AudioCapture;
pub use pcm::{Pcm16Frames, StereoFrame};
pub use source::{AudioSource, DeviceSource, Pcm16StreamSource, WavFileSource};
