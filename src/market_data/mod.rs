// Market data module entrypoint
pub mod adapters;       // order book sources (HTTP REST)
pub mod normaliser;     // raw [id, price, amount] records -> net price levels
pub mod external_book;  // normalized snapshot of the exchange book
pub mod market_maker;   // settle / cancel / quote engine
pub mod router;         // fixed-interval cycle driver
