//! Catalog read side: public product listings and lookups

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::models::Product;
use crate::utils::{AppError, AppResult, PageQuery, Paginated};

use super::InventoryService;

/// Sort orders the listing accepts. A closed set: anything else in the
/// query string is rejected during extraction and never reaches the SQL.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl CatalogSort {
    fn order_clause(&self) -> &'static str {
        match self {
            CatalogSort::Newest => "created_at DESC, id DESC",
            // price is TEXT, compare numerically
            CatalogSort::PriceAsc => "CAST(price AS REAL) ASC, id",
            CatalogSort::PriceDesc => "CAST(price AS REAL) DESC, id",
            CatalogSort::Name => "name COLLATE NOCASE ASC, id",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    /// Substring match against the product name
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub sort: CatalogSort,
}

impl InventoryService {
    /// Public product listing, active products only
    pub async fn list_products(
        &self,
        filter: &CatalogFilter,
        page: PageQuery,
    ) -> AppResult<Paginated<Product>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM products WHERE is_active = 1");
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM products WHERE is_active = 1");

        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", q.trim());
            for b in [&mut qb, &mut count_qb] {
                b.push(" AND name LIKE ").push_bind(pattern.clone());
            }
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.trim().is_empty()) {
            for b in [&mut qb, &mut count_qb] {
                b.push(" AND category = ").push_bind(category.trim().to_string());
            }
        }

        qb.push(" ORDER BY ")
            .push(filter.sort.order_clause())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items: Vec<Product> = qb.build_query_as().fetch_all(self.db().read()).await?;
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.db().read())
            .await?;

        Ok(Paginated::new(items, page, total))
    }

    /// Single product lookup; inactive products are hidden
    pub async fn get_product(&self, product_id: i64) -> AppResult<Product> {
        let product: Option<Product> =
            sqlx::query_as("SELECT * FROM products WHERE id = ? AND is_active = 1")
                .bind(product_id)
                .fetch_optional(self.db().read())
                .await?;
        product.ok_or_else(|| AppError::not_found(format!("Produto {product_id} não encontrado")))
    }

    /// Distinct categories of active products, alphabetical
    pub async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products WHERE is_active = 1 ORDER BY category",
        )
        .fetch_all(self.db().read())
        .await?;
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::*;
    use rust_decimal_macros::dec;

    async fn setup() -> (crate::db::DbService, InventoryService) {
        let db = mem_db().await;
        let service = InventoryService::new(db.clone());
        (db, service)
    }

    async fn seed_catalog(db: &crate::db::DbService) -> i64 {
        seed_product(db, "Notebook Gamer", dec!(4500.00), 3, None).await;
        seed_product(db, "Mouse Sem Fio", dec!(85.00), 20, None).await;
        let hidden = seed_product(db, "Fone Antigo", dec!(40.00), 0, None).await;
        deactivate_product(db, hidden).await;
        hidden
    }

    #[tokio::test]
    async fn test_listing_hides_inactive_products() {
        let (db, service) = setup().await;
        let hidden = seed_catalog(&db).await;

        let page = service
            .list_products(&CatalogFilter::default(), PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert!(page.items.iter().all(|p| p.id != hidden));

        let err = service.get_product(hidden).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_filters_and_sort() {
        let (db, service) = setup().await;
        seed_catalog(&db).await;

        let page = service
            .list_products(
                &CatalogFilter { q: Some("mouse".into()), ..Default::default() },
                PageQuery::default(),
            )
            .await
            .unwrap();
        // SQLite LIKE is case-insensitive for ASCII
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].name, "Mouse Sem Fio");

        let page = service
            .list_products(
                &CatalogFilter { sort: CatalogSort::PriceAsc, ..Default::default() },
                PageQuery::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.items[0].name, "Mouse Sem Fio");
        assert_eq!(page.items[1].name, "Notebook Gamer");

        let page = service
            .list_products(
                &CatalogFilter { category: Some("Livros".into()), ..Default::default() },
                PageQuery::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_categories_are_distinct_active_only() {
        let (db, service) = setup().await;
        seed_catalog(&db).await;

        let categories = service.list_categories().await.unwrap();
        assert_eq!(categories, vec!["Eletrônicos".to_string()]);
    }
}
