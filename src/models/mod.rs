pub mod analysis;
pub mod chat;
pub mod de;
pub mod inventory;
