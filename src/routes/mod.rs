/// Router Module Index
///
/// The data surface under `/api`, split by who may call it. Access control is
/// attached per group in `create_router` (route layers), never per handler.

/// Routes open to everyone, signed in or not.
pub mod public;

/// Routes that need a session of any role.
pub mod authenticated;

/// Routes restricted to the `admin` role.
pub mod admin;
