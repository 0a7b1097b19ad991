//! Relational layout of the catalog.
//!
//! `desc` is an SQL keyword, hence the quoting. Foreign keys cascade on
//! delete so removing a theme clears its whole subtree.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS themes (
    tid INTEGER NOT NULL PRIMARY KEY,
    url VARCHAR(1000) NOT NULL,
    "desc" VARCHAR(1000) NOT NULL,
    UNIQUE (url),
    UNIQUE ("desc")
);

CREATE TABLE IF NOT EXISTS categories (
    tid INTEGER REFERENCES themes (tid) ON DELETE CASCADE,
    "desc" VARCHAR(1000) NOT NULL,
    PRIMARY KEY ("desc"),
    UNIQUE ("desc")
);

CREATE INDEX IF NOT EXISTS idx_categories_tid ON categories (tid);

CREATE TABLE IF NOT EXISTS emissions (
    pid INTEGER NOT NULL PRIMARY KEY,
    cid VARCHAR(1000) NOT NULL REFERENCES categories ("desc") ON DELETE CASCADE,
    "desc" VARCHAR(1000) NOT NULL,
    url VARCHAR(1000) NOT NULL,
    ts DATETIME,
    UNIQUE (url)
);

CREATE INDEX IF NOT EXISTS idx_emissions_cid ON emissions (cid);

CREATE TABLE IF NOT EXISTS videos (
    vid INTEGER NOT NULL PRIMARY KEY,
    pid INTEGER NOT NULL REFERENCES emissions (pid) ON DELETE CASCADE,
    "desc" VARCHAR(1000) NOT NULL,
    url VARCHAR(1000) NOT NULL,
    UNIQUE (url)
);

CREATE INDEX IF NOT EXISTS idx_videos_pid ON videos (pid);

CREATE TABLE IF NOT EXISTS streams (
    vid INTEGER NOT NULL REFERENCES videos (vid) ON DELETE CASCADE,
    quality VARCHAR(50) NOT NULL,
    url VARCHAR(1000) NOT NULL,
    PRIMARY KEY (vid, quality),
    UNIQUE (url)
);
"#;
