//! String helpers shared by the services and the CLI.

pub mod format;

pub use format::{
    email_local_part, encode_uri_component, percent_decode, percent_encode, truncate_string,
};
