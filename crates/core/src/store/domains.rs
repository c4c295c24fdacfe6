//! Domain CRUD operations.
//!
//! Writes never take `updated_at` from the caller; the database clock
//! assigns it on every insert and update.

use std::time::Duration;

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, types::ToSql};

use super::queries::{NOW_SQL, format_timestamp, parse_timestamp};
use super::{Db, Deadline, Page, Queries};
use crate::{Domain, Error};

const DOMAIN_COLUMNS: &str =
    "id, name, server_changed, ssl_grade, previous_ssl_grade, logo, title, is_down, created_at, updated_at";

struct DomainRow {
    id: String,
    name: String,
    server_changed: bool,
    ssl_grade: Option<String>,
    previous_ssl_grade: Option<String>,
    logo: String,
    title: String,
    is_down: bool,
    created_at: String,
    updated_at: String,
}

impl DomainRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            server_changed: row.get(2)?,
            ssl_grade: row.get(3)?,
            previous_ssl_grade: row.get(4)?,
            logo: row.get(5)?,
            title: row.get(6)?,
            is_down: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_domain(self) -> Result<Domain, Error> {
        Ok(Domain {
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            name: self.name,
            servers: Vec::new(),
            server_changed: self.server_changed,
            ssl_grade: self.ssl_grade,
            previous_ssl_grade: self.previous_ssl_grade,
            logo: self.logo,
            title: self.title,
            is_down: self.is_down,
        })
    }
}

fn require_id(id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::EmptyIdentifier("domain id"));
    }
    Ok(())
}

impl Queries<'_> {
    /// Insert a domain row. Servers are stored separately.
    pub fn create_domain(&self, domain: &Domain) -> Result<Domain, Error> {
        require_id(&domain.id)?;
        self.conn()?.execute(
            &format!(
                "INSERT INTO domains ({DOMAIN_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, {NOW_SQL})"
            ),
            params![
                &domain.id,
                &domain.name,
                domain.server_changed,
                &domain.ssl_grade,
                &domain.previous_ssl_grade,
                &domain.logo,
                &domain.title,
                domain.is_down,
                format_timestamp(&domain.created_at),
            ],
        )?;

        self.get_domain(&domain.id)?
            .ok_or_else(|| Error::NoSuchRecord(format!("domain {}", domain.id)))
    }

    /// Get a domain row by id, without its servers.
    pub fn get_domain(&self, id: &str) -> Result<Option<Domain>, Error> {
        require_id(id)?;
        self.conn()?
            .query_row(
                &format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE id = ?1"),
                params![id],
                DomainRow::read,
            )
            .optional()?
            .map(DomainRow::into_domain)
            .transpose()
    }

    /// Get a domain with its servers in canonical order.
    pub fn get_domain_with_servers(&self, id: &str) -> Result<Option<Domain>, Error> {
        let Some(mut domain) = self.get_domain(id)? else {
            return Ok(None);
        };
        domain.servers = self.list_servers_by_domain(id)?;
        Ok(Some(domain))
    }

    /// List domains ordered by id, each with its servers.
    pub fn list_domains(&self, page: Page) -> Result<Vec<Domain>, Error> {
        let mut stmt = self
            .conn()?
            .prepare(&format!("SELECT {DOMAIN_COLUMNS} FROM domains ORDER BY id LIMIT ?1 OFFSET ?2"))?;
        let rows = stmt
            .query_map(params![page.limit, page.offset], DomainRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.attach_servers(rows)
    }

    /// List domains whose last write falls within `window` of now, oldest first.
    pub fn list_domains_updated_within(&self, window: Duration) -> Result<Vec<Domain>, Error> {
        let modifier = format!("-{} seconds", window.as_secs());
        let mut stmt = self.conn()?.prepare(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains
             WHERE updated_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)
             AND updated_at <= {NOW_SQL}
             ORDER BY updated_at, id"
        ))?;
        let rows = stmt
            .query_map(params![modifier], DomainRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.attach_servers(rows)
    }

    fn attach_servers(&self, rows: Vec<DomainRow>) -> Result<Vec<Domain>, Error> {
        rows.into_iter()
            .map(|row| {
                let mut domain = row.into_domain()?;
                domain.servers = self.list_servers_by_domain(&domain.id)?;
                Ok(domain)
            })
            .collect()
    }

    pub fn update_domain_grade(&self, id: &str, ssl_grade: &str) -> Result<Domain, Error> {
        self.update_domain(id, "ssl_grade = ?2", &ssl_grade)
    }

    pub fn update_domain_previous_grade(&self, id: &str, previous_ssl_grade: Option<&str>) -> Result<Domain, Error> {
        self.update_domain(id, "previous_ssl_grade = ?2", &previous_ssl_grade)
    }

    pub fn update_domain_server_changed(&self, id: &str, server_changed: bool) -> Result<Domain, Error> {
        self.update_domain(id, "server_changed = ?2", &server_changed)
    }

    fn update_domain(&self, id: &str, assignment: &str, value: &dyn ToSql) -> Result<Domain, Error> {
        require_id(id)?;
        let changed = self.conn()?.execute(
            &format!("UPDATE domains SET {assignment}, updated_at = {NOW_SQL} WHERE id = ?1"),
            [&id as &dyn ToSql, value],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchRecord(format!("domain {id}")));
        }

        self.get_domain(id)?
            .ok_or_else(|| Error::NoSuchRecord(format!("domain {id}")))
    }

    /// Delete a domain; its servers go with it.
    pub fn delete_domain(&self, id: &str) -> Result<(), Error> {
        require_id(id)?;
        let deleted = self.conn()?.execute("DELETE FROM domains WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NoSuchRecord(format!("domain {id}")));
        }
        Ok(())
    }
}

impl Db {
    pub async fn create_domain(&self, deadline: Deadline, domain: &Domain) -> Result<Domain, Error> {
        let domain = domain.clone();
        self.with_transaction(deadline, move |q| q.create_domain(&domain)).await
    }

    pub async fn get_domain(&self, deadline: Deadline, id: &str) -> Result<Option<Domain>, Error> {
        let id = id.to_string();
        self.run(deadline, move |q| q.get_domain(&id)).await
    }

    pub async fn get_domain_with_servers(&self, deadline: Deadline, id: &str) -> Result<Option<Domain>, Error> {
        let id = id.to_string();
        self.run(deadline, move |q| q.get_domain_with_servers(&id)).await
    }

    pub async fn list_domains(&self, deadline: Deadline, page: Page) -> Result<Vec<Domain>, Error> {
        self.run(deadline, move |q| q.list_domains(page)).await
    }

    pub async fn list_domains_updated_within(&self, deadline: Deadline, window: Duration) -> Result<Vec<Domain>, Error> {
        self.run(deadline, move |q| q.list_domains_updated_within(window)).await
    }

    pub async fn update_domain_grade(&self, deadline: Deadline, id: &str, ssl_grade: &str) -> Result<Domain, Error> {
        let (id, ssl_grade) = (id.to_string(), ssl_grade.to_string());
        self.with_transaction(deadline, move |q| q.update_domain_grade(&id, &ssl_grade)).await
    }

    pub async fn update_domain_previous_grade(
        &self, deadline: Deadline, id: &str, previous_ssl_grade: Option<&str>,
    ) -> Result<Domain, Error> {
        let (id, previous) = (id.to_string(), previous_ssl_grade.map(str::to_string));
        self.with_transaction(deadline, move |q| q.update_domain_previous_grade(&id, previous.as_deref()))
            .await
    }

    pub async fn update_domain_server_changed(
        &self, deadline: Deadline, id: &str, server_changed: bool,
    ) -> Result<Domain, Error> {
        let id = id.to_string();
        self.with_transaction(deadline, move |q| q.update_domain_server_changed(&id, server_changed))
            .await
    }

    pub async fn delete_domain(&self, deadline: Deadline, id: &str) -> Result<(), Error> {
        let id = id.to_string();
        self.with_transaction(deadline, move |q| q.delete_domain(&id)).await
    }
}
