// Order lifecycle primitives shared by the market maker
pub mod types;        // sides, ids, open orders, inventory, engine errors
pub mod open_orders;  // live synthetic orders
pub mod gateway;      // order-submission seam (simulated)
