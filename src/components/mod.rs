mod frame_slider;
mod spin_viewer;

pub use frame_slider::FrameSlider;
pub use spin_viewer::SpinViewer;
