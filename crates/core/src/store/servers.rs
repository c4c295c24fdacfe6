//! Server CRUD operations.

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row};

use super::queries::{NOW_SQL, format_timestamp, parse_timestamp};
use super::{Db, Deadline, Page, Queries};
use crate::{Error, Server};

const SERVER_COLUMNS: &str = "id, domain_id, address, ssl_grade, country, owner, created_at, updated_at";

struct ServerRow {
    id: String,
    domain_id: String,
    address: String,
    ssl_grade: String,
    country: String,
    owner: String,
    created_at: String,
    updated_at: String,
}

impl ServerRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            domain_id: row.get(1)?,
            address: row.get(2)?,
            ssl_grade: row.get(3)?,
            country: row.get(4)?,
            owner: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_server(self) -> Result<Server, Error> {
        Ok(Server {
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            domain_id: self.domain_id,
            address: self.address,
            ssl_grade: self.ssl_grade,
            country: self.country,
            owner: self.owner,
        })
    }
}

fn require_id(field: &'static str, id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::EmptyIdentifier(field));
    }
    Ok(())
}

impl Queries<'_> {
    /// Insert a server at `position` in its domain's canonical order.
    ///
    /// The owning domain must already exist.
    pub fn create_server(&self, server: &Server, position: usize) -> Result<Server, Error> {
        require_id("server id", &server.id)?;
        require_id("domain id", &server.domain_id)?;
        self.conn()?.execute(
            &format!(
                "INSERT INTO servers (id, domain_id, position, address, ssl_grade, country, owner, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, {NOW_SQL})"
            ),
            params![
                &server.id,
                &server.domain_id,
                position as i64,
                &server.address,
                &server.ssl_grade,
                &server.country,
                &server.owner,
                format_timestamp(&server.created_at),
            ],
        )?;

        self.get_server(&server.id)?
            .ok_or_else(|| Error::NoSuchRecord(format!("server {}", server.id)))
    }

    pub fn get_server(&self, id: &str) -> Result<Option<Server>, Error> {
        require_id("server id", id)?;
        self.conn()?
            .query_row(
                &format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?1"),
                params![id],
                ServerRow::read,
            )
            .optional()?
            .map(ServerRow::into_server)
            .transpose()
    }

    pub fn list_servers(&self, page: Page) -> Result<Vec<Server>, Error> {
        let mut stmt = self.conn()?.prepare(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers ORDER BY domain_id, position LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![page.limit, page.offset], ServerRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ServerRow::into_server).collect()
    }

    /// Servers of one domain, index 0 first.
    pub fn list_servers_by_domain(&self, domain_id: &str) -> Result<Vec<Server>, Error> {
        require_id("domain id", domain_id)?;
        let mut stmt = self
            .conn()?
            .prepare(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE domain_id = ?1 ORDER BY position"))?;
        let rows = stmt
            .query_map(params![domain_id], ServerRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ServerRow::into_server).collect()
    }

    pub fn update_server_grade(&self, id: &str, ssl_grade: &str) -> Result<Server, Error> {
        require_id("server id", id)?;
        if ssl_grade.is_empty() {
            return Err(Error::InvalidInput("ssl grade cannot be empty".into()));
        }

        let changed = self.conn()?.execute(
            &format!("UPDATE servers SET ssl_grade = ?2, updated_at = {NOW_SQL} WHERE id = ?1"),
            params![id, ssl_grade],
        )?;
        if changed == 0 {
            return Err(Error::NoSuchRecord(format!("server {id}")));
        }

        self.get_server(id)?
            .ok_or_else(|| Error::NoSuchRecord(format!("server {id}")))
    }

    pub fn delete_server(&self, id: &str) -> Result<(), Error> {
        require_id("server id", id)?;
        let deleted = self.conn()?.execute("DELETE FROM servers WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NoSuchRecord(format!("server {id}")));
        }
        Ok(())
    }
}

impl Db {
    pub async fn create_server(&self, deadline: Deadline, server: &Server, position: usize) -> Result<Server, Error> {
        let server = server.clone();
        self.with_transaction(deadline, move |q| q.create_server(&server, position)).await
    }

    pub async fn get_server(&self, deadline: Deadline, id: &str) -> Result<Option<Server>, Error> {
        let id = id.to_string();
        self.run(deadline, move |q| q.get_server(&id)).await
    }

    pub async fn list_servers(&self, deadline: Deadline, page: Page) -> Result<Vec<Server>, Error> {
        self.run(deadline, move |q| q.list_servers(page)).await
    }

    pub async fn list_servers_by_domain(&self, deadline: Deadline, domain_id: &str) -> Result<Vec<Server>, Error> {
        let domain_id = domain_id.to_string();
        self.run(deadline, move |q| q.list_servers_by_domain(&domain_id)).await
    }

    pub async fn update_server_grade(&self, deadline: Deadline, id: &str, ssl_grade: &str) -> Result<Server, Error> {
        let (id, ssl_grade) = (id.to_string(), ssl_grade.to_string());
        self.with_transaction(deadline, move |q| q.update_server_grade(&id, &ssl_grade)).await
    }

    pub async fn delete_server(&self, deadline: Deadline, id: &str) -> Result<(), Error> {
        let id = id.to_string();
        self.with_transaction(deadline, move |q| q.delete_server(&id)).await
    }
}
