mod coupon;
mod creator;
mod fulfillment;
mod order;
mod payment;
mod product;
mod slot;

pub use coupon::*;
pub use creator::*;
pub use fulfillment::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use slot::*;
