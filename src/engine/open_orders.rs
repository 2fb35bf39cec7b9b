use crate::engine::types::{OpenOrder, OrderId};

/// Live synthetic orders. Order of insertion is kept only for display.
#[derive(Debug, Default, Clone)]
pub struct OpenOrderBook {
    orders: Vec<OpenOrder>,
}

impl OpenOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenOrder> {
        self.orders.iter()
    }

    pub fn get(&self, id: OrderId) -> Option<&OpenOrder> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn insert(&mut self, order: OpenOrder) {
        self.orders.push(order);
    }

    pub fn remove(&mut self, id: OrderId) -> Option<OpenOrder> {
        let idx = self.orders.iter().position(|o| o.id == id)?;
        Some(self.orders.remove(idx))
    }

    /// Copy of the current orders, safe to walk while removing from `self`.
    pub fn snapshot(&self) -> Vec<OpenOrder> {
        self.orders.clone()
    }

    pub fn drain(&mut self) -> Vec<OpenOrder> {
        std::mem::take(&mut self.orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Side;
    use rust_decimal_macros::dec;

    fn order(id: u64) -> OpenOrder {
        OpenOrder { id: OrderId(id), side: Side::Ask, price: dec!(100), amount: dec!(1), reserved_value: dec!(1) }
    }

    #[test]
    fn test_remove_while_walking_snapshot() {
        let mut book = OpenOrderBook::new();
        for id in 1..=4 {
            book.insert(order(id));
        }
        let mut visited = 0;
        for o in book.snapshot() {
            visited += 1;
            assert!(book.remove(o.id).is_some());
        }
        assert_eq!(visited, 4);
        assert!(book.is_empty());
    }

    #[test]
    fn test_drain_empties() {
        let mut book = OpenOrderBook::new();
        book.insert(order(7));
        assert_eq!(book.get(OrderId(7)).map(|o| o.amount), Some(dec!(1)));
        assert_eq!(book.drain().len(), 1);
        assert!(book.drain().is_empty());
        assert_eq!(book.remove(OrderId(7)), None);
    }
}
