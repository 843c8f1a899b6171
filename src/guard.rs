//! Fatal-error recovery around a codec invocation.
//!
//! A codec signals a fatal condition by returning `Err` from wherever it is,
//! or by panicking. Either way control comes back to
//! [`ErrorUnwindGuard::run`], which formats the diagnostic, destroys every
//! codec context still registered in the [`ErrorContext`], and hands the
//! caller a [`TranscodeError`].

use crate::codec::CodecContext;
use crate::error::{CodecFault, TranscodeError};
use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// The codec contexts alive during one transform.
pub struct ErrorContext<D: CodecContext, C: CodecContext> {
    decompress: Option<D>,
    compress: Option<C>,
}

impl<D: CodecContext, C: CodecContext> ErrorContext<D, C> {
    pub fn new() -> Self {
        Self {
            decompress: None,
            compress: None,
        }
    }

    /// Registers the decode-side context. A previously registered one is
    /// destroyed first.
    pub fn set_decompress(&mut self, context: D) -> &mut D {
        if let Some(mut previous) = self.decompress.take() {
            previous.destroy();
        }
        self.decompress.insert(context)
    }

    /// Registers the encode-side context. A previously registered one is
    /// destroyed first.
    pub fn set_compress(&mut self, context: C) -> &mut C {
        if let Some(mut previous) = self.compress.take() {
            previous.destroy();
        }
        self.compress.insert(context)
    }

    pub fn decompress_mut(&mut self) -> Option<&mut D> {
        self.decompress.as_mut()
    }

    pub fn compress_mut(&mut self) -> Option<&mut C> {
        self.compress.as_mut()
    }

    /// Both contexts at once, for the step that reads one and writes the other.
    pub fn both_mut(&mut self) -> (Option<&mut D>, Option<&mut C>) {
        (self.decompress.as_mut(), self.compress.as_mut())
    }

    pub fn is_decompress_active(&self) -> bool {
        self.decompress.is_some()
    }

    pub fn is_compress_active(&self) -> bool {
        self.compress.is_some()
    }

    /// Normal-path teardown of the decode side.
    pub fn finish_decompress(&mut self) {
        if let Some(mut context) = self.decompress.take() {
            context.destroy();
        }
    }

    /// Normal-path teardown of the encode side.
    pub fn finish_compress(&mut self) {
        if let Some(mut context) = self.compress.take() {
            context.destroy();
        }
    }

    /// Destroys whatever is still registered and returns how many contexts
    /// that was. Safe to call any number of times.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        if let Some(mut context) = self.decompress.take() {
            context.destroy();
            released += 1;
        }
        if let Some(mut context) = self.compress.take() {
            context.destroy();
            released += 1;
        }
        released
    }
}

impl<D: CodecContext, C: CodecContext> Default for ErrorContext<D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: CodecContext, C: CodecContext> Drop for ErrorContext<D, C> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Recovery point installed before a codec runs.
pub struct ErrorUnwindGuard<D: CodecContext, C: CodecContext> {
    context: ErrorContext<D, C>,
    tripped: bool,
}

impl<D: CodecContext, C: CodecContext> ErrorUnwindGuard<D, C> {
    pub fn new() -> Self {
        Self {
            context: ErrorContext::new(),
            tripped: false,
        }
    }

    /// Whether a fatal error has been captured.
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    pub fn context(&self) -> &ErrorContext<D, C> {
        &self.context
    }

    /// Runs `job` with the guard's context and converts any fatal outcome.
    ///
    /// Once tripped the guard refuses further work: the codec state it was
    /// protecting is gone.
    pub fn run<T>(
        &mut self,
        job: impl FnOnce(&mut ErrorContext<D, C>) -> Result<T, CodecFault>,
    ) -> Result<T, TranscodeError> {
        if self.tripped {
            return Err(TranscodeError::Codec {
                message: "error guard already handled a fatal error".to_string(),
            });
        }

        let context = &mut self.context;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(context)));
        match outcome {
            Ok(Ok(value)) => {
                let leftover = self.context.release_all();
                if leftover > 0 {
                    debug!("released {} codec context(s) left open by the codec", leftover);
                }
                Ok(value)
            }
            Ok(Err(fault)) => Err(self.trip(fault)),
            Err(payload) => {
                let fault = CodecFault::message(format!(
                    "codec aborted: {}",
                    panic_message(payload.as_ref())
                ));
                Err(self.trip(fault))
            }
        }
    }

    fn trip(&mut self, fault: CodecFault) -> TranscodeError {
        self.tripped = true;
        let message = fault.to_string();
        let released = self.context.release_all();
        warn!(
            "transform failed: {} ({} codec context(s) released)",
            message, released
        );
        fault.into()
    }
}

impl<D: CodecContext, C: CodecContext> Default for ErrorUnwindGuard<D, C> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
