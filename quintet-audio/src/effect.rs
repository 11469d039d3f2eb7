//! Real-time processing trait

/// Anything that processes interleaved audio in place on the audio thread
pub trait Effect: Send {
    /// Process audio samples in place (interleaved)
    fn process(&mut self, samples: &mut [f32]);

    /// Reset processing state
    fn reset(&mut self);

    /// Check if processing is enabled
    fn is_enabled(&self) -> bool;

    /// Enable/disable processing
    fn set_enabled(&mut self, enabled: bool);

    /// Get processor name
    fn name(&self) -> &'static str;
}
