use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::SHOPPING_LIST_FILENAME;

/// A raw ingredient line of some recipe in a user's cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    /// Sums cart lines per `(name, unit)`. Lines are never deduplicated by
    /// recipe, so an ingredient listed twice in one recipe counts twice.
    /// Items come out ordered by name, then unit.
    pub fn aggregate<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = CartLine>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

        for line in lines {
            *totals
                .entry((line.name, line.measurement_unit))
                .or_insert(0) += i64::from(line.amount);
        }

        let items = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListItem {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self { items }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Plain text download, one `<name> - <amount> <unit>` line per item.
    pub fn render_text(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} - {} {}", item.name, item.amount, item.measurement_unit))
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// `Content-Disposition` value for serving `render_text` as a download.
    pub fn content_disposition() -> String {
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\"")
    }
}

impl IntoIterator for ShoppingList {
    type Item = ShoppingListItem;
    type IntoIter = std::vec::IntoIter<ShoppingListItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
