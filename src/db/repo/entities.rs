//! Row encoding and decoding for the per-kind entity tables.
//!
//! Decimals are stored as canonical strings so no precision is lost to
//! SQLite's REAL affinity.

use crate::store::{Entity, EntityKind, StoreError};
use crate::domain::{
    Commodity, Decimal, Global, Industry, ProjectId, SocialClass, Stock, StockKey, VersionId,
};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::fmt::Display;
use std::str::FromStr;

fn decimal_column(
    row: &SqliteRow,
    column: &str,
    kind: EntityKind,
    key: &str,
) -> Result<Decimal, StoreError> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text)
        .map_err(|e| StoreError::corrupt(kind, key, format!("{} = {:?}: {}", column, text, e)))
}

fn enum_column<T>(row: &SqliteRow, column: &str, kind: EntityKind, key: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    let text: String = row.try_get(column)?;
    T::from_str(&text).map_err(|e| StoreError::corrupt(kind, key, e))
}

pub(super) async fn insert_entity(
    conn: &mut SqliteConnection,
    project: ProjectId,
    version: VersionId,
    entity: &Entity,
) -> Result<(), sqlx::Error> {
    match entity {
        Entity::Commodity(c) => {
            sqlx::query(
                r#"
                INSERT INTO commodities
                (project, version, name, origin, function, unit_value, unit_price, turnover_time,
                 replenishment_demand, allocation_share, stock_used_up, stock_produced, surplus_product)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.as_i64())
            .bind(version.as_i64())
            .bind(&c.name)
            .bind(c.origin.as_str())
            .bind(c.function.as_str())
            .bind(c.unit_value.to_canonical_string())
            .bind(c.unit_price.to_canonical_string())
            .bind(c.turnover_time.to_canonical_string())
            .bind(c.replenishment_demand.to_canonical_string())
            .bind(c.allocation_share.to_canonical_string())
            .bind(c.stock_used_up.to_canonical_string())
            .bind(c.stock_produced.to_canonical_string())
            .bind(c.surplus_product.to_canonical_string())
            .execute(&mut *conn)
            .await?;
        }
        Entity::Stock(s) => {
            sqlx::query(
                r#"
                INSERT INTO stocks
                (project, version, owner_kind, owner, stock_type, commodity, quantity, value, price,
                 production_coefficient, consumption_coefficient, replenishment_demand)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.as_i64())
            .bind(version.as_i64())
            .bind(s.key.owner_kind.as_str())
            .bind(&s.key.owner)
            .bind(s.key.stock_type.as_str())
            .bind(&s.key.commodity)
            .bind(s.quantity.to_canonical_string())
            .bind(s.value.to_canonical_string())
            .bind(s.price.to_canonical_string())
            .bind(s.production_coefficient.to_canonical_string())
            .bind(s.consumption_coefficient.to_canonical_string())
            .bind(s.replenishment_demand.to_canonical_string())
            .execute(&mut *conn)
            .await?;
        }
        Entity::Industry(i) => {
            sqlx::query(
                r#"
                INSERT INTO industries
                (project, version, name, commodity, proposed_output, output, initial_capital, profit)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.as_i64())
            .bind(version.as_i64())
            .bind(&i.name)
            .bind(&i.commodity)
            .bind(i.proposed_output.to_canonical_string())
            .bind(i.output.to_canonical_string())
            .bind(i.initial_capital.to_canonical_string())
            .bind(i.profit.to_canonical_string())
            .execute(&mut *conn)
            .await?;
        }
        Entity::SocialClass(c) => {
            sqlx::query(
                r#"
                INSERT INTO social_classes
                (project, version, name, revenue, population, participation_ratio, property_share)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.as_i64())
            .bind(version.as_i64())
            .bind(&c.name)
            .bind(c.revenue.to_canonical_string())
            .bind(c.population.to_canonical_string())
            .bind(c.participation_ratio.to_canonical_string())
            .bind(c.property_share.to_canonical_string())
            .execute(&mut *conn)
            .await?;
        }
        Entity::Global(g) => {
            sqlx::query(
                r#"
                INSERT INTO globals
                (project, version, melt, labour_supply_response, price_dynamics, revenue_share)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(project.as_i64())
            .bind(version.as_i64())
            .bind(g.melt.to_canonical_string())
            .bind(g.labour_supply_response.as_str())
            .bind(g.price_dynamics.as_str())
            .bind(g.revenue_share.to_canonical_string())
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

fn select_sql(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Commodity => {
            "SELECT * FROM commodities WHERE project = ? AND version = ? ORDER BY name ASC"
        }
        EntityKind::Stock => {
            "SELECT * FROM stocks WHERE project = ? AND version = ?
             ORDER BY owner_kind ASC, owner ASC, stock_type ASC, commodity ASC"
        }
        EntityKind::Industry => {
            "SELECT * FROM industries WHERE project = ? AND version = ? ORDER BY name ASC"
        }
        EntityKind::SocialClass => {
            "SELECT * FROM social_classes WHERE project = ? AND version = ? ORDER BY name ASC"
        }
        EntityKind::Global => "SELECT * FROM globals WHERE project = ? AND version = ?",
    }
}

pub(super) async fn select_entities(
    pool: &SqlitePool,
    kind: EntityKind,
    project: ProjectId,
    version: VersionId,
) -> Result<Vec<Entity>, StoreError> {
    let rows = sqlx::query(select_sql(kind))
        .bind(project.as_i64())
        .bind(version.as_i64())
        .fetch_all(pool)
        .await?;

    rows.iter().map(|row| decode(kind, row)).collect()
}

fn decode(kind: EntityKind, row: &SqliteRow) -> Result<Entity, StoreError> {
    match kind {
        EntityKind::Commodity => decode_commodity(row).map(Entity::Commodity),
        EntityKind::Stock => decode_stock(row).map(Entity::Stock),
        EntityKind::Industry => decode_industry(row).map(Entity::Industry),
        EntityKind::SocialClass => decode_class(row).map(Entity::SocialClass),
        EntityKind::Global => decode_global(row).map(Entity::Global),
    }
}

fn decode_commodity(row: &SqliteRow) -> Result<Commodity, StoreError> {
    const KIND: EntityKind = EntityKind::Commodity;
    let name: String = row.try_get("name")?;
    let dec = |column: &str| decimal_column(row, column, KIND, &name);

    Ok(Commodity {
        origin: enum_column(row, "origin", KIND, &name)?,
        function: enum_column(row, "function", KIND, &name)?,
        unit_value: dec("unit_value")?,
        unit_price: dec("unit_price")?,
        turnover_time: dec("turnover_time")?,
        replenishment_demand: dec("replenishment_demand")?,
        allocation_share: dec("allocation_share")?,
        stock_used_up: dec("stock_used_up")?,
        stock_produced: dec("stock_produced")?,
        surplus_product: dec("surplus_product")?,
        name: name.clone(),
    })
}

fn decode_stock(row: &SqliteRow) -> Result<Stock, StoreError> {
    const KIND: EntityKind = EntityKind::Stock;
    let owner: String = row.try_get("owner")?;
    let commodity: String = row.try_get("commodity")?;
    let owner_kind_text: String = row.try_get("owner_kind")?;
    let stock_type_text: String = row.try_get("stock_type")?;
    let label = format!("{}/{}/{}/{}", owner_kind_text, owner, stock_type_text, commodity);

    let key = StockKey::new(
        enum_column(row, "owner_kind", KIND, &label)?,
        owner,
        enum_column(row, "stock_type", KIND, &label)?,
        commodity,
    );
    let dec = |column: &str| decimal_column(row, column, KIND, &label);

    Ok(Stock {
        quantity: dec("quantity")?,
        value: dec("value")?,
        price: dec("price")?,
        production_coefficient: dec("production_coefficient")?,
        consumption_coefficient: dec("consumption_coefficient")?,
        replenishment_demand: dec("replenishment_demand")?,
        key,
    })
}

fn decode_industry(row: &SqliteRow) -> Result<Industry, StoreError> {
    const KIND: EntityKind = EntityKind::Industry;
    let name: String = row.try_get("name")?;
    let dec = |column: &str| decimal_column(row, column, KIND, &name);

    Ok(Industry {
        commodity: row.try_get("commodity")?,
        proposed_output: dec("proposed_output")?,
        output: dec("output")?,
        initial_capital: dec("initial_capital")?,
        profit: dec("profit")?,
        name: name.clone(),
    })
}

fn decode_class(row: &SqliteRow) -> Result<SocialClass, StoreError> {
    const KIND: EntityKind = EntityKind::SocialClass;
    let name: String = row.try_get("name")?;
    let dec = |column: &str| decimal_column(row, column, KIND, &name);

    Ok(SocialClass {
        revenue: dec("revenue")?,
        population: dec("population")?,
        participation_ratio: dec("participation_ratio")?,
        property_share: dec("property_share")?,
        name: name.clone(),
    })
}

fn decode_global(row: &SqliteRow) -> Result<Global, StoreError> {
    const KIND: EntityKind = EntityKind::Global;
    let key = crate::store::GLOBAL_KEY;

    Ok(Global {
        melt: decimal_column(row, "melt", KIND, key)?,
        labour_supply_response: enum_column(row, "labour_supply_response", KIND, key)?,
        price_dynamics: enum_column(row, "price_dynamics", KIND, key)?,
        revenue_share: decimal_column(row, "revenue_share", KIND, key)?,
    })
}
