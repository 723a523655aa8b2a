#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every selected scenario ran to completion. Request failures do not change this.
    Success = 0,

    /// Invalid CLI/config (bad flags, missing API key, invalid scenario file or index).
    InvalidInput = 1,

    /// The run could not be carried out (transport setup failure, task join failure, IO).
    RuntimeError = 2,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
