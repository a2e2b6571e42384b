pub mod morse;
pub mod playback;
pub mod synth;
pub mod timing;
