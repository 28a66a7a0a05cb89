pub mod damage;
pub mod identity;
pub mod inventory;
pub mod time;
