//! `SeaORM` Entity for approval_requests table.
//!
//! `required_approvers` and `approvals` are JSON arrays.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub currency: String,
    pub source_type: Option<String>,
    pub source_id: Option<Uuid>,
    pub status: String,
    pub required_approvers: Json,
    pub approvals: Json,
    pub disbursement_voucher: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
