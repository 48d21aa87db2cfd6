//! UI-facing adapters. Implement NotifierPort.

pub mod toast;

pub use toast::TracingToast;
