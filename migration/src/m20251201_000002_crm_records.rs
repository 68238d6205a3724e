use sea_orm_migration::prelude::*;

use crate::m20251201_000001_accounts::AppUser;

#[derive(DeriveIden)]
enum Category {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Service {
    Table,
    Id,
    Name,
    Description,
    PriceCents,
    TariffType,
    CategoryId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum IndividualContact {
    Table,
    Id,
    Civility,
    LastName,
    FirstName,
    BirthDate,
    Email,
    Phone,
    Source,
    Notes,
    Address,
    City,
    PostalCode,
    Country,
    OwnerId,
    RelationTier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    LegalName,
    RegistrationId,
    LegalForm,
    Sector,
    Email,
    Phone,
    Website,
    Address,
    City,
    PostalCode,
    Country,
    PrimaryContactId,
    Headcount,
    Source,
    Notes,
    OwnerId,
    AccountTier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Opportunity {
    Table,
    Id,
    Name,
    Description,
    Status,
    AmountCents,
    OwnerId,
    IndividualId,
    CompanyId,
    ServiceId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn timestamp_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Category::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Category::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Category::Description).text())
                    .col(&mut timestamp_col(Category::CreatedAt))
                    .col(&mut timestamp_col(Category::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Service::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Service::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Service::Description).text())
                    .col(ColumnDef::new(Service::PriceCents).big_integer().not_null())
                    .col(ColumnDef::new(Service::TariffType).string_len(32).not_null())
                    .col(ColumnDef::new(Service::CategoryId).uuid())
                    .col(ColumnDef::new(Service::IsActive).boolean().not_null())
                    .col(&mut timestamp_col(Service::CreatedAt))
                    .col(&mut timestamp_col(Service::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_category")
                            .from(Service::Table, Service::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_service_category")
                    .table(Service::Table)
                    .col(Service::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IndividualContact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IndividualContact::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::Civility)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::LastName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::FirstName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IndividualContact::BirthDate).date().not_null())
                    .col(
                        ColumnDef::new(IndividualContact::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::Phone)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(IndividualContact::Source).string_len(20))
                    .col(ColumnDef::new(IndividualContact::Notes).text())
                    .col(ColumnDef::new(IndividualContact::Address).text().not_null())
                    .col(
                        ColumnDef::new(IndividualContact::City)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::PostalCode)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualContact::Country)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IndividualContact::OwnerId).uuid())
                    .col(
                        ColumnDef::new(IndividualContact::RelationTier)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(&mut timestamp_col(IndividualContact::CreatedAt))
                    .col(&mut timestamp_col(IndividualContact::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_individual_contact_owner")
                            .from(IndividualContact::Table, IndividualContact::OwnerId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_individual_contact_owner")
                    .table(IndividualContact::Table)
                    .col(IndividualContact::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Company::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Company::LegalName)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Company::RegistrationId)
                            .string_len(15)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Company::LegalForm).string_len(32).not_null())
                    .col(ColumnDef::new(Company::Sector).string_len(1).not_null())
                    .col(
                        ColumnDef::new(Company::Email)
                            .string_len(254)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Company::Phone)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Company::Website).string_len(200))
                    .col(ColumnDef::new(Company::Address).text().not_null())
                    .col(ColumnDef::new(Company::City).string_len(100).not_null())
                    .col(ColumnDef::new(Company::PostalCode).string_len(10).not_null())
                    .col(ColumnDef::new(Company::Country).string_len(100).not_null())
                    .col(ColumnDef::new(Company::PrimaryContactId).uuid())
                    .col(ColumnDef::new(Company::Headcount).string_len(10))
                    .col(ColumnDef::new(Company::Source).string_len(20))
                    .col(ColumnDef::new(Company::Notes).text())
                    .col(ColumnDef::new(Company::OwnerId).uuid())
                    .col(ColumnDef::new(Company::AccountTier).string_len(16).not_null())
                    .col(&mut timestamp_col(Company::CreatedAt))
                    .col(&mut timestamp_col(Company::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_owner")
                            .from(Company::Table, Company::OwnerId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_primary_contact")
                            .from(Company::Table, Company::PrimaryContactId)
                            .to(IndividualContact::Table, IndividualContact::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_company_owner")
                    .table(Company::Table)
                    .col(Company::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Opportunity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Opportunity::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Opportunity::Name)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Opportunity::Description).text())
                    .col(ColumnDef::new(Opportunity::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Opportunity::AmountCents).big_integer())
                    .col(ColumnDef::new(Opportunity::OwnerId).uuid())
                    .col(ColumnDef::new(Opportunity::IndividualId).uuid())
                    .col(ColumnDef::new(Opportunity::CompanyId).uuid())
                    .col(ColumnDef::new(Opportunity::ServiceId).uuid())
                    .col(&mut timestamp_col(Opportunity::CreatedAt))
                    .col(&mut timestamp_col(Opportunity::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opportunity_owner")
                            .from(Opportunity::Table, Opportunity::OwnerId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opportunity_individual")
                            .from(Opportunity::Table, Opportunity::IndividualId)
                            .to(IndividualContact::Table, IndividualContact::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opportunity_company")
                            .from(Opportunity::Table, Opportunity::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opportunity_service")
                            .from(Opportunity::Table, Opportunity::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_opportunity_owner", Opportunity::OwnerId),
            ("idx_opportunity_individual", Opportunity::IndividualId),
            ("idx_opportunity_company", Opportunity::CompanyId),
            ("idx_opportunity_service", Opportunity::ServiceId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Opportunity::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Opportunity::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(IndividualContact::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Service::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
