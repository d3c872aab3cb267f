//! `SeaORM` Entity for cost_lots table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub lot_date: Date,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub unit_cost: Decimal,
    pub source: String,
    pub source_ref_type: Option<String>,
    pub source_ref_id: Option<Uuid>,
    pub sequence: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lot_consumptions::Entity")]
    LotConsumptions,
}

impl Related<super::lot_consumptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LotConsumptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
