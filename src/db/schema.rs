//! The relational schema, described once and rendered for SQLite, MySQL and
//! PostgreSQL. The running server applies the SQLite rendition at startup; the
//! other two are printed by the `schema` subcommand.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
    Postgres,
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(format!(
                "Unknown dialect '{}' (expected sqlite, mysql or postgres)",
                other
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgres",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ColumnType {
    /// Auto-incrementing integer primary key
    Id,
    /// Integer referencing another table's `Id`
    Ref,
    Int,
    BigInt,
    Varchar(u16),
    Text,
    Bool,
    Decimal(u8, u8),
    Date,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
    CurrentTimestamp,
    /// CURRENT_TIMESTAMP that MySQL also refreshes on every update
    UpdatedTimestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub cascade: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub checks: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    pub indexes: &'static [Index],
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: false,
        unique: false,
        default: None,
    }
}

const fn opt(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: true,
        unique: false,
        default: None,
    }
}

const fn uniq(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: false,
        unique: true,
        default: None,
    }
}

const fn with_default(name: &'static str, ty: ColumnType, default: DefaultValue) -> Column {
    Column {
        name,
        ty,
        nullable: false,
        unique: false,
        default: Some(default),
    }
}

const ID: Column = col("id", ColumnType::Id);
const CREATED_AT: Column = with_default(
    "created_at",
    ColumnType::Timestamp,
    DefaultValue::CurrentTimestamp,
);
const UPDATED_AT: Column = with_default(
    "updated_at",
    ColumnType::Timestamp,
    DefaultValue::UpdatedTimestamp,
);
const USER_REF: ForeignKey = ForeignKey {
    column: "user_id",
    table: "users",
    cascade: true,
};

pub const TABLES: &[Table] = &[
    Table {
        name: "users",
        columns: &[
            ID,
            col("name", ColumnType::Varchar(100)),
            uniq("email", ColumnType::Varchar(255)),
            opt("password_hash", ColumnType::Varchar(255)),
            opt("phone", ColumnType::Varchar(20)),
            opt("location", ColumnType::Varchar(100)),
            opt("date_of_birth", ColumnType::Date),
            opt("university", ColumnType::Varchar(200)),
            opt("course", ColumnType::Varchar(200)),
            opt("year", ColumnType::Varchar(20)),
            opt("roll_number", ColumnType::Varchar(50)),
            opt("gpa", ColumnType::Decimal(3, 2)),
            opt("bio", ColumnType::Text),
            with_default("is_verified", ColumnType::Bool, DefaultValue::Bool(false)),
            with_default("is_suspended", ColumnType::Bool, DefaultValue::Bool(false)),
            opt("last_login", ColumnType::Timestamp),
            CREATED_AT,
            UPDATED_AT,
        ],
        checks: &[],
        foreign_keys: &[],
        indexes: &[Index {
            name: "idx_users_created_at",
            columns: &["created_at"],
        }],
    },
    Table {
        name: "user_skills",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("skill_name", ColumnType::Varchar(100)),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[USER_REF],
        indexes: &[Index {
            name: "idx_user_skills_user",
            columns: &["user_id"],
        }],
    },
    Table {
        name: "user_interests",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("interest_name", ColumnType::Varchar(100)),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[USER_REF],
        indexes: &[Index {
            name: "idx_user_interests_user",
            columns: &["user_id"],
        }],
    },
    Table {
        name: "user_achievements",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("achievement_text", ColumnType::Text),
            opt("achievement_date", ColumnType::Date),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[USER_REF],
        indexes: &[Index {
            name: "idx_user_achievements_user",
            columns: &["user_id"],
        }],
    },
    Table {
        name: "user_projects",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("project_name", ColumnType::Varchar(200)),
            opt("description", ColumnType::Text),
            opt("technologies", ColumnType::Varchar(500)),
            opt("project_url", ColumnType::Varchar(500)),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[USER_REF],
        indexes: &[Index {
            name: "idx_user_projects_user",
            columns: &["user_id"],
        }],
    },
    Table {
        name: "audio_history",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("original_text", ColumnType::Text),
            col("rewritten_text", ColumnType::Text),
            col("tone", ColumnType::Varchar(50)),
            col("voice", ColumnType::Varchar(50)),
            opt("audio_file_path", ColumnType::Varchar(500)),
            with_default("audio_generated", ColumnType::Bool, DefaultValue::Bool(false)),
            with_default(
                "processing_status",
                ColumnType::Varchar(20),
                DefaultValue::Str("pending"),
            ),
            CREATED_AT,
            UPDATED_AT,
        ],
        checks: &["processing_status IN ('pending', 'processing', 'completed', 'failed')"],
        foreign_keys: &[USER_REF],
        indexes: &[Index {
            name: "idx_audio_history_user_created",
            columns: &["user_id", "created_at"],
        }],
    },
    Table {
        name: "downloads",
        columns: &[
            ID,
            col("user_id", ColumnType::Ref),
            col("history_id", ColumnType::Ref),
            col("original_filename", ColumnType::Varchar(255)),
            col("stored_filename", ColumnType::Varchar(255)),
            col("file_path", ColumnType::Varchar(500)),
            opt("file_size", ColumnType::BigInt),
            opt("mime_type", ColumnType::Varchar(100)),
            with_default("download_count", ColumnType::Int, DefaultValue::Int(0)),
            CREATED_AT,
            opt("last_downloaded_at", ColumnType::Timestamp),
        ],
        checks: &[],
        foreign_keys: &[
            USER_REF,
            ForeignKey {
                column: "history_id",
                table: "audio_history",
                cascade: true,
            },
        ],
        indexes: &[Index {
            name: "idx_downloads_user_created",
            columns: &["user_id", "created_at"],
        }],
    },
    Table {
        name: "tones",
        columns: &[
            ID,
            uniq("tone_id", ColumnType::Varchar(50)),
            col("tone_name", ColumnType::Varchar(100)),
            opt("description", ColumnType::Text),
            col("prompt_template", ColumnType::Text),
            with_default("is_active", ColumnType::Bool, DefaultValue::Bool(true)),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[],
        indexes: &[],
    },
    Table {
        name: "voices",
        columns: &[
            ID,
            uniq("voice_id", ColumnType::Varchar(50)),
            col("voice_name", ColumnType::Varchar(100)),
            opt("description", ColumnType::Text),
            opt("gender", ColumnType::Varchar(20)),
            col("provider_voice_id", ColumnType::Varchar(100)),
            opt("alias_of", ColumnType::Varchar(50)),
            with_default("is_active", ColumnType::Bool, DefaultValue::Bool(true)),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[],
        indexes: &[],
    },
    Table {
        name: "admins",
        columns: &[
            ID,
            col("name", ColumnType::Varchar(100)),
            uniq("email", ColumnType::Varchar(255)),
            col("password_hash", ColumnType::Varchar(255)),
            with_default("role", ColumnType::Varchar(20), DefaultValue::Str("admin")),
            with_default("is_active", ColumnType::Bool, DefaultValue::Bool(true)),
            opt("last_login", ColumnType::Timestamp),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[],
        indexes: &[],
    },
    Table {
        name: "admin_sessions",
        columns: &[
            ID,
            uniq("token", ColumnType::Varchar(64)),
            col("admin_id", ColumnType::Ref),
            col("expires_at", ColumnType::Timestamp),
            CREATED_AT,
        ],
        checks: &[],
        foreign_keys: &[ForeignKey {
            column: "admin_id",
            table: "admins",
            cascade: true,
        }],
        indexes: &[],
    },
];

/// Seed rows for a configuration table.
pub struct Seed {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub rows: &'static [&'static [SeedValue]],
}

#[derive(Debug, Clone, Copy)]
pub enum SeedValue {
    Str(&'static str),
    Bool(bool),
    Null,
}

use SeedValue::{Bool as B, Null as N, Str as S};

pub const SEEDS: &[Seed] = &[
    Seed {
        table: "tones",
        columns: &["tone_id", "tone_name", "description", "prompt_template", "is_active"],
        rows: &[
            &[S("neutral"), S("Neutral"), S("Clear and balanced narration"),
              S("Rewrite the following text in a clear, balanced, and professional tone while maintaining the original meaning:"), B(true)],
            &[S("suspenseful"), S("Suspenseful"), S("Dramatic and engaging delivery"),
              S("Rewrite the following text to create suspense and drama, making it more engaging and thrilling while preserving the core message:"), B(true)],
            &[S("inspiring"), S("Inspiring"), S("Uplifting and motivational tone"),
              S("Rewrite the following text in an uplifting, motivational, and inspiring tone that encourages and energizes the reader:"), B(true)],
            &[S("cheerful"), S("Cheerful"), S("Bright, happy, and energetic"),
              S("Rewrite the following text in a bright, happy, and energetic tone that conveys joy and positivity:"), B(true)],
            &[S("sad"), S("Sad"), S("Soft, somber, and emotional"),
              S("Rewrite the following text in a soft, somber, and emotional tone that conveys melancholy and reflection:"), B(true)],
            &[S("angry"), S("Angry"), S("Intense and passionate delivery"),
              S("Rewrite the following text with intensity and passion, conveying strong emotions and determination:"), B(true)],
            &[S("playful"), S("Playful"), S("Fun, lively, and whimsical"),
              S("Rewrite the following text in a fun, lively, and whimsical tone that is entertaining and lighthearted:"), B(true)],
            &[S("calm"), S("Calm"), S("Relaxed and soothing narration"),
              S("Rewrite the following text in a relaxed, soothing, and peaceful tone that promotes tranquility:"), B(true)],
            &[S("confident"), S("Confident"), S("Assured and persuasive"),
              S("Rewrite the following text in an assured, persuasive, and authoritative tone that conveys certainty and leadership:"), B(true)],
        ],
    },
    Seed {
        table: "voices",
        columns: &["voice_id", "voice_name", "description", "gender", "provider_voice_id", "alias_of", "is_active"],
        rows: &[
            &[S("david"), S("David"), S("Confident and clear male voice"), S("male"), S("en-US_MichaelV3Voice"), N, B(true)],
            &[S("zira"), S("Zira"), S("Professional and warm female voice"), S("female"), S("en-US_AllisonV3Voice"), N, B(true)],
            &[S("heera"), S("Heera"), S("Expressive and engaging female voice"), S("female"), S("en-US_EmilyV3Voice"), N, B(true)],
            &[S("mark"), S("Mark"), S("Strong and authoritative male voice"), S("male"), S("en-US_HenryV3Voice"), N, B(true)],
            &[S("ravi"), S("Ravi"), S("Smooth and articulate male voice"), S("male"), S("en-US_KevinV3Voice"), N, B(true)],
            &[S("lisa"), S("Lisa"), N, S("female"), S("en-US_AllisonV3Voice"), S("zira"), B(true)],
            &[S("michael"), S("Michael"), N, S("male"), S("en-US_MichaelV3Voice"), S("david"), B(true)],
            &[S("allison"), S("Allison"), N, S("female"), S("en-US_EmilyV3Voice"), S("heera"), B(true)],
        ],
    },
];

/// Every statement needed to create the schema and seed configuration rows.
pub fn statements(dialect: Dialect) -> Vec<String> {
    let mut out = Vec::new();

    for table in TABLES {
        out.push(create_table(table, dialect));
        if dialect != Dialect::Mysql {
            for index in table.indexes {
                out.push(format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index.name,
                    table.name,
                    index.columns.join(", ")
                ));
            }
        }
    }

    for seed in SEEDS {
        for row in seed.rows {
            out.push(insert_seed(seed, row, dialect));
        }
    }

    out
}

/// The whole schema as one script.
pub fn render_script(dialect: Dialect) -> String {
    let mut script = format!("-- tonecast schema ({})\n\n", dialect);
    for statement in statements(dialect) {
        script.push_str(&statement);
        script.push_str(";\n\n");
    }
    script
}

fn create_table(table: &Table, dialect: Dialect) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {}", column_definition(c, dialect)))
        .collect();

    for check in table.checks {
        lines.push(format!("    CHECK ({})", check));
    }

    for fk in table.foreign_keys {
        let mut line = format!(
            "    FOREIGN KEY ({}) REFERENCES {}(id)",
            fk.column, fk.table
        );
        if fk.cascade {
            line.push_str(" ON DELETE CASCADE");
        }
        lines.push(line);
    }

    if dialect == Dialect::Mysql {
        for index in table.indexes {
            lines.push(format!(
                "    INDEX {} ({})",
                index.name,
                index.columns.join(", ")
            ));
        }
    }

    let suffix = match dialect {
        Dialect::Mysql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        _ => "",
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n){}",
        table.name,
        lines.join(",\n"),
        suffix
    )
}

fn column_definition(column: &Column, dialect: Dialect) -> String {
    if let ColumnType::Id = column.ty {
        let id = match dialect {
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Mysql => "INT AUTO_INCREMENT PRIMARY KEY",
            Dialect::Postgres => "SERIAL PRIMARY KEY",
        };
        return format!("{} {}", column.name, id);
    }

    let mut def = format!("{} {}", column.name, type_name(column.ty, dialect));

    if column.nullable {
        // MySQL TIMESTAMP columns are NOT NULL unless told otherwise
        if dialect == Dialect::Mysql && matches!(column.ty, ColumnType::Timestamp) {
            def.push_str(" NULL");
        }
    } else {
        def.push_str(" NOT NULL");
    }

    if column.unique {
        def.push_str(" UNIQUE");
    }

    if let Some(default) = column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(default, dialect));
    }

    def
}

fn type_name(ty: ColumnType, dialect: Dialect) -> String {
    match (ty, dialect) {
        (ColumnType::Id | ColumnType::Ref | ColumnType::Int, Dialect::Mysql) => "INT".into(),
        (ColumnType::Id | ColumnType::Ref | ColumnType::Int, _) => "INTEGER".into(),
        (ColumnType::BigInt, _) => "BIGINT".into(),
        (ColumnType::Varchar(n), _) => format!("VARCHAR({})", n),
        (ColumnType::Text, _) => "TEXT".into(),
        (ColumnType::Bool, _) => "BOOLEAN".into(),
        (ColumnType::Decimal(..), Dialect::Sqlite) => "REAL".into(),
        (ColumnType::Decimal(p, s), Dialect::Mysql) => format!("DECIMAL({},{})", p, s),
        (ColumnType::Decimal(p, s), Dialect::Postgres) => format!("NUMERIC({},{})", p, s),
        (ColumnType::Date, _) => "DATE".into(),
        (ColumnType::Timestamp, _) => "TIMESTAMP".into(),
    }
}

fn default_literal(default: DefaultValue, dialect: Dialect) -> String {
    match default {
        DefaultValue::Bool(b) => bool_literal(b, dialect).to_string(),
        DefaultValue::Int(i) => i.to_string(),
        DefaultValue::Str(s) => quote(s),
        DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
        DefaultValue::UpdatedTimestamp => match dialect {
            Dialect::Mysql => "CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".into(),
            _ => "CURRENT_TIMESTAMP".into(),
        },
    }
}

fn bool_literal(value: bool, dialect: Dialect) -> &'static str {
    match (dialect, value) {
        (Dialect::Sqlite, true) => "1",
        (Dialect::Sqlite, false) => "0",
        (_, true) => "TRUE",
        (_, false) => "FALSE",
    }
}

fn insert_seed(seed: &Seed, row: &[SeedValue], dialect: Dialect) -> String {
    let values: Vec<String> = row
        .iter()
        .map(|v| match v {
            SeedValue::Str(s) => quote(s),
            SeedValue::Bool(b) => bool_literal(*b, dialect).to_string(),
            SeedValue::Null => "NULL".to_string(),
        })
        .collect();

    let columns = seed.columns.join(", ");
    let values = values.join(", ");

    match dialect {
        Dialect::Sqlite => format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            seed.table, columns, values
        ),
        Dialect::Mysql => format!(
            "INSERT IGNORE INTO {} ({}) VALUES ({})",
            seed.table, columns, values
        ),
        Dialect::Postgres => format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            seed.table, columns, values
        ),
    }
}

/// Quote a SQL string literal, doubling embedded single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
