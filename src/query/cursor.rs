use crate::item::Item;
use crate::table::ItemTable;
use std::sync::Arc;

/// Lazily rebuilds items from a shared match set.
#[derive(Clone, Debug)]
pub struct ItemCursor {
    pub table: Arc<ItemTable>,
    pub pos: usize,
}

impl ItemCursor {
    #[must_use]
    pub fn new(table: Arc<ItemTable>) -> Self {
        Self { table, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<Item> {
        let item = self.table.records().get(self.pos)?.to_item();
        self.pos += 1;
        Some(item)
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Item> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(item) = self.advance() {
            out.push(item);
        }
        out
    }
}

impl Iterator for ItemCursor {
    type Item = Item;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.table.len().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for ItemCursor {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn cursor_yields_items_in_order() {
        let dt = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let pt = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        let table = ItemTable::from_items(vec![
            Item::new("x", pt.clone(), dt),
            Item::new("y", pt, dt),
        ])
        .unwrap();
        let mut c = ItemCursor::new(Arc::new(table));
        assert_eq!(c.len(), 2);
        assert_eq!(c.next().map(|i| i.id), Some("x".to_string()));
        assert_eq!(c.len(), 1);
        let rest = c.to_vec();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "y");
    }
}
