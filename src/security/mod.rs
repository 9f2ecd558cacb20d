pub mod command_executor;
pub mod two_factor;

pub use command_executor::SafeCommandExecutor;
pub use two_factor::{
    OtpState, TerminalPrompter, get_otp_code, get_token_is_required, mask_token, redact_args,
};
