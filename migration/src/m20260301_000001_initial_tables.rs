use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 users 表
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::SessionToken).string().null())
                    .to_owned(),
            )
            .await?;

        // 创建 urls 表，owner_id 外键指向 users.id
        manager
            .create_table(
                Table::create()
                    .table(Urls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Urls::Url)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Urls::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Urls::OwnerId).string().null())
                    .col(ColumnDef::new(Urls::Deleted).boolean().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_urls_owner_id")
                            .from(Urls::Table, Urls::OwnerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 按 owner 列出链接
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_urls_owner_id")
                    .table(Urls::Table)
                    .col(Urls::OwnerId)
                    .to_owned(),
            )
            .await?;

        // 按会话值查找用户
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_session_token")
                    .table(Users::Table)
                    .col(Users::SessionToken)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_users_session_token")
                    .table(Users::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_urls_owner_id")
                    .table(Urls::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Urls::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    SessionToken,
}

#[derive(DeriveIden)]
enum Urls {
    Table,
    Url,
    Id,
    OwnerId,
    Deleted,
}
