use serde::{Deserialize, Serialize};

use till_core::{DomainError, DomainResult, Entity, ProductId};

/// Catalog entry: what a cashier can put into a sale.
///
/// Immutable from the till's point of view. Fields are public so catalog
/// payloads can be deserialized directly; use [`Product::new`] when building
/// one by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price.
    pub price: f64,
    pub category: String,
}

impl Product {
    /// Build a validated product.
    ///
    /// Rejects an empty name and a negative or non-finite price.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> DomainResult<Self> {
        let product = Self {
            id: ProductId::new(id),
            name: name.into(),
            price,
            category: category.into(),
        };
        product.validate()?;
        Ok(product)
    }

    /// Check the catalog invariants on an already-built (e.g. deserialized) product.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::validation(format!(
                "product price must be a non-negative number (got {})",
                self.price
            )));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_accepts_a_regular_product() {
        let polenta = Product::new(1, "Polenta", 4.5, "Cibo").unwrap();
        assert_eq!(polenta.id, ProductId::new(1));
        assert_eq!(polenta.name, "Polenta");
        assert_eq!(polenta.price, 4.5);
        assert_eq!(polenta.category, "Cibo");
    }

    #[test]
    fn free_products_are_allowed() {
        assert!(Product::new(2, "Acqua", 0.0, "Bevande").is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = Product::new(1, "Polenta", -0.5, "Cibo").unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("non-negative") => {}
            _ => panic!("Expected validation error for negative price"),
        }
    }

    #[test]
    fn nan_price_is_rejected() {
        assert!(Product::new(1, "Polenta", f64::NAN, "Cibo").is_err());
        assert!(Product::new(1, "Polenta", f64::INFINITY, "Cibo").is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Product::new(1, "   ", 1.0, "Cibo").unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("name") => {}
            _ => panic!("Expected validation error for blank name"),
        }
    }

    #[test]
    fn deserializes_catalog_shape() {
        let json = r#"{"id":1,"name":"Polenta","price":4.5,"category":"Cibo"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product, Product::new(1, "Polenta", 4.5, "Cibo").unwrap());
        assert!(product.validate().is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any finite non-negative price with a non-blank name is accepted.
        #[test]
        fn valid_inputs_always_construct(
            id in any::<i64>(),
            name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
            price in 0.0f64..10_000.0f64,
        ) {
            let product = Product::new(id, name.clone(), price, "Cibo");
            prop_assert!(product.is_ok());
            let product = product.unwrap();
            prop_assert_eq!(product.id.get(), id);
            prop_assert_eq!(product.name, name);
        }
    }
}
