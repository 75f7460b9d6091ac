//! Platform layer for running a 1990s software-rendered game engine on a
//! handheld console.
//!
//! The engine draws into an 8-bit paletted framebuffer and mixes 16-bit PCM
//! into a small ring. This crate turns those into what the console expects:
//! a 32-bit RGBA surface presented once per frame ([`video`]), and blocks of
//! audio handed to the hardware output queue ([`audio`]). It also maps the
//! controller onto engine keys ([`input`]), provides the file-handle table
//! and allocation shims the engine calls into ([`sys`]), and runs the frame
//! loop that ties them together ([`platform`]).
//!
//! Every console SDK call goes through a trait in [`host`], so the adapters
//! run the same against real hardware, a desktop window, or the in-memory
//! doubles in [`testing`].

pub mod audio;
pub mod host;
pub mod input;
pub mod palette;
pub mod platform;
pub mod sys;
pub mod timing;
pub mod video;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use audio::{AudioError, AudioSubmitter, DmaInfo, PcmRing, SubmitReport};
pub use host::{AudioOut, Controller, Display, HostError, Surface, TickSource};
pub use input::{EngineKey, KeyEvent, KeySink};
pub use palette::Palette;
pub use platform::{Engine, FrameContext, FrameReport, Platform, PlatformError};
pub use sys::{EngineParams, SysError};
pub use timing::{TICK_HZ, Ticks};
pub use video::{Rect, VideoError, VideoPresenter, VideoSettings};
