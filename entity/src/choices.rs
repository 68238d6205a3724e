use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Relationship stage of a client record. Derived from won opportunities,
/// never written directly by callers.
#[derive(
    Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum RelationTier {
    #[default]
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "client")]
    Client,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    #[sea_orm(string_value = "phone")]
    Phone,
    #[sea_orm(string_value = "web")]
    Web,
    #[sea_orm(string_value = "referral")]
    Referral,
    #[sea_orm(string_value = "trade_show")]
    TradeShow,
    #[sea_orm(string_value = "social")]
    Social,
    #[sea_orm(string_value = "other")]
    Other,
}
