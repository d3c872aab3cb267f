//! `SeaORM` Entity for lot_consumptions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lot_consumptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lot_id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub source_type: String,
    pub source_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cost_lots::Entity",
        from = "Column::LotId",
        to = "super::cost_lots::Column::Id"
    )]
    CostLots,
}

impl Related<super::cost_lots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostLots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
