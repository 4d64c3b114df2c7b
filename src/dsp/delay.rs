//! Feedback delay line
//!
//! Single-tap delay whose output is fed back into its own input:
//! `wet[n] = x[n - D] + feedback * wet[n - D]`, output `x + wet`.

/// Circular feedback delay line
#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    /// Circular buffer, exactly `delay_samples` long
    buffer: Vec<f32>,
    /// Current read/write position in the circular buffer
    write_pos: usize,
    /// Feedback amount (0-0.95, NOT 1.0 to prevent infinite feedback)
    feedback: f32,
}

impl FeedbackDelay {
    /// Create a delay line
    ///
    /// # Arguments
    /// * `delay_samples` - Delay in samples (at least 1)
    /// * `feedback` - Feedback amount (clamped to 0-0.95)
    pub fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: feedback.clamp(0.0, 0.95),
        }
    }

    /// Delay length in samples
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one input sample, returning the delayed (wet) sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input + self.feedback * delayed;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        delayed
    }

    /// Render one channel as dry + wet, extended by `tail_samples`
    pub fn render(&mut self, input: &[f32], tail_samples: usize) -> Vec<f32> {
        let out_len = input.len() + tail_samples;
        (0..out_len)
            .map(|i| {
                let dry = input.get(i).copied().unwrap_or(0.0);
                dry + self.process_sample(dry)
            })
            .collect()
    }
}
