//! # Shared Constants
//!
//! This module provides a centralized location for constants that are shared across
//! the crates of the `hslookup` workspace, such as fixed assistant replies and default paths.

/// The default path for the SQLite mirror of the catalog.
pub const DEFAULT_DB_FILE: &str = "db/hslookup.db";

/// The default directory where uploaded images are written.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Keywords that mark a message as a lookup request.
pub const LOOKUP_KEYWORDS: [&str; 6] = ["how", "what", "tell", "show", "get", "find"];

/// Reply recorded when a message is not a lookup request.
pub const ACKNOWLEDGEMENT_REPLY: &str = "Thank you for your message!";

/// Reply recorded when a generated query cannot be executed.
pub const QUERY_FAILURE_REPLY: &str = "I encountered an error while processing your request.";

/// Reply recorded when the completion endpoint fails.
pub const COMPLETION_FAILURE_REPLY: &str =
    "Sorry, an error occurred while contacting the assistant. Please try again.";

/// Notice returned when a submission carries no text.
pub const EMPTY_MESSAGE_NOTICE: &str = "Please provide a text input, an image, or both.";

/// Upper bound on the number of images accepted with one submission.
pub const MAX_UPLOAD_IMAGES: usize = 3;

/// File extensions accepted for uploaded images.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
