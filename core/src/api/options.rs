//! Configuration options for a Blaze session.

/// Resource limits for the virtual machine.
///
/// # Example
///
/// ```
/// use blaze_core::api::VmOptions;
///
/// let options = VmOptions {
///     stack_size: 512,
///     ..VmOptions::default()
/// };
/// assert_eq!(options.max_frames, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOptions {
    /// Operand stack capacity, in values.
    ///
    /// Default: 2048
    pub stack_size: usize,

    /// Maximum call depth, the main program included.
    ///
    /// Default: 1024
    pub max_frames: usize,
}

impl VmOptions {
    pub const DEFAULT_STACK_SIZE: usize = 2048;
    pub const DEFAULT_MAX_FRAMES: usize = 1024;
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            stack_size: Self::DEFAULT_STACK_SIZE,
            max_frames: Self::DEFAULT_MAX_FRAMES,
        }
    }
}

/// Configuration options for a [`Session`](crate::api::Session).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Limits applied to every execution in the session.
    pub vm: VmOptions,
}
