//! Live HTTP broker adapter. Vendor SDK integration is out of scope for this
//! engine core (see DESIGN.md); this crate is kept as a placeholder member
//! so the workspace continues to build and is dropped in the final trim.
