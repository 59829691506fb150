//! Capability-trait-object adapter (C5/C10/C11).
//!
//! `synchro_core::Emitter` and `synchro_core::Receiver` are independent
//! traits: a concrete node implements any non-empty subset. The executor
//! (§4.12) is written once against a single object-safe [`GraphNode`] trait;
//! these wrappers adapt a concrete node to it without touching the
//! `Emitter`/`Receiver` definitions themselves, matching §9's ADDED note
//! that processors combine capabilities freely (`original_source`'s
//! `EmittingNodeMixin`/`ReceivingNodeMixin` are independent ABCs a node may
//! inherit from in any combination).

use synchro_core::{Contextual, Emitter, Frame, LifecycleResult, NodeCapabilities, Receiver};

/// Object-safe view of a graph node the executor can drive without knowing
/// its concrete capability set.
pub trait GraphNode: Send {
    /// Acquires external resources (§4.5).
    fn acquire(&mut self) -> LifecycleResult;
    /// Releases external resources (§4.5).
    fn release(&mut self);
    /// Which of `Emitter`/`Receiver` this node implements.
    fn capabilities(&self) -> NodeCapabilities;
    /// Produces the next Frame. Only called when `capabilities().emits`.
    fn emit(&mut self) -> Option<Frame>;
    /// Consumes a Frame from `source`. Only called when `capabilities().receives`.
    fn receive(&mut self, source: &str, frame: Frame);
}

/// Wraps a node that only implements [`Emitter`] (file/device input).
pub struct EmitterOnly<T>(pub T);

impl<T: Emitter + Send> GraphNode for EmitterOnly<T> {
    fn acquire(&mut self) -> LifecycleResult {
        self.0.acquire()
    }

    fn release(&mut self) {
        self.0.release();
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::emitter_only()
    }

    fn emit(&mut self) -> Option<Frame> {
        self.0.emit()
    }

    fn receive(&mut self, _source: &str, _frame: Frame) {}
}

/// Wraps a node that only implements [`Receiver`] (file/device output, the
/// level meter).
pub struct ReceiverOnly<T>(pub T);

impl<T: Receiver + Send> GraphNode for ReceiverOnly<T> {
    fn acquire(&mut self) -> LifecycleResult {
        self.0.acquire()
    }

    fn release(&mut self) {
        self.0.release();
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::receiver_only()
    }

    fn emit(&mut self) -> Option<Frame> {
        None
    }

    fn receive(&mut self, source: &str, frame: Frame) {
        self.0.receive(source, frame);
    }
}

/// Wraps a node that implements both [`Emitter`] and [`Receiver`]
/// (every in-graph processor: validator, resampler, VAD, normalizer,
/// denoiser, mixer, WhisperPrep, the translation connector).
pub struct EmitterReceiver<T>(pub T);

impl<T: Emitter + Receiver + Send> GraphNode for EmitterReceiver<T> {
    fn acquire(&mut self) -> LifecycleResult {
        Contextual::acquire(&mut self.0)
    }

    fn release(&mut self) {
        Contextual::release(&mut self.0);
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::both()
    }

    fn emit(&mut self) -> Option<Frame> {
        Emitter::emit(&mut self.0)
    }

    fn receive(&mut self, source: &str, frame: Frame) {
        Receiver::receive(&mut self.0, source, frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_dsp::FormatValidator;
    use synchro_core::AudioFormat;

    #[test]
    fn emitter_receiver_wrapper_reports_both_capabilities() {
        let node = EmitterReceiver(FormatValidator::new("v", true, AudioFormat::Int16, true));
        assert_eq!(node.capabilities(), NodeCapabilities::both());
    }
}
