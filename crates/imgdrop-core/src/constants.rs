//! Constants shared across crates.

/// Value shipped in sample `.env` files; never a usable token.
pub const PLACEHOLDER_BOT_TOKEN: &str = "your-bot-token-here";

/// Default upload ceiling in MiB (Bot API download limit).
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 20;

/// Extension used when a source name carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Route prefix for the HTML view page.
pub const VIEW_ROUTE: &str = "/view";

/// Route prefix for raw image bytes.
pub const IMAGE_ROUTE: &str = "/image";
