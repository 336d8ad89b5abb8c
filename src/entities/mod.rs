// Entity Models
//
// Drawers keep a stable id; their settings (name, target till, flags) are
// values the CRUD collaborator may replace at any time.

pub mod drawer;

pub use drawer::{DrawerSettings, TargetProfile};
