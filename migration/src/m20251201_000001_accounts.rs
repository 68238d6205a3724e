use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum AppUser {
    Table,
    Id,
    Username,
    FirstName,
    LastName,
    Email,
    Role,
    IsSuperuser,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserSecret {
    Table,
    UserId,
    PasswordHash,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RoleGroup {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum UserGroup {
    Table,
    UserId,
    GroupId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppUser::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(AppUser::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AppUser::FirstName).string_len(150).not_null())
                    .col(ColumnDef::new(AppUser::LastName).string_len(150).not_null())
                    .col(ColumnDef::new(AppUser::Email).string_len(254))
                    .col(ColumnDef::new(AppUser::Role).string_len(16).not_null())
                    .col(ColumnDef::new(AppUser::IsSuperuser).boolean().not_null())
                    .col(ColumnDef::new(AppUser::IsActive).boolean().not_null())
                    .col(
                        ColumnDef::new(AppUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppUser::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSecret::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSecret::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserSecret::PasswordHash).text().not_null())
                    .col(
                        ColumnDef::new(UserSecret::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_secret_user")
                            .from(UserSecret::Table, UserSecret::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleGroup::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RoleGroup::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(RoleGroup::Name)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroup::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserGroup::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserGroup::GroupId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserGroup::UserId)
                            .col(UserGroup::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_user")
                            .from(UserGroup::Table, UserGroup::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_group")
                            .from(UserGroup::Table, UserGroup::GroupId)
                            .to(RoleGroup::Table, RoleGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroup::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleGroup::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSecret::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppUser::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
