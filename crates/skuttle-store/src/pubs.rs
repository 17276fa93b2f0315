use rusqlite::params;
use skuttle_shared::MultiserverAddress;

use crate::database::{now_ms, ViewDatabase};
use crate::error::{Result, StoreError};
use crate::models::{millis_to_date, KnownPub};
use crate::posts::parse_col;

impl ViewDatabase {
    /// Relay addresses announced on indexed feeds, most recently working first.
    pub fn known_pubs(&self) -> Result<Vec<KnownPub>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT relay.author, ad.address, announcer.author, ad.worked_last, ad.last_err
                 FROM addresses ad
                 JOIN authors relay     ON relay.id = ad.about_id
                 JOIN authors announcer ON announcer.id = ad.announcer
                 WHERE ad.in_use = 1
                 ORDER BY ad.worked_last DESC NULLS LAST, ad.address_id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                let worked_last: Option<i64> = row.get(3)?;
                Ok(KnownPub {
                    identity: parse_col(row, 0)?,
                    address: parse_col(row, 1)?,
                    announced_by: parse_col(row, 2)?,
                    worked_last: worked_last.map(millis_to_date),
                    last_error: row.get(4)?,
                })
            })?;

            let mut pubs = Vec::new();
            for row in rows {
                pubs.push(row?);
            }
            Ok(pubs)
        })
    }

    /// Record the outcome of a connection attempt to an announced relay.
    pub fn record_pub_attempt(&self, address: &MultiserverAddress, error: Option<&str>) -> Result<()> {
        let updated = self.write(|tx| {
            let updated = match error {
                None => tx.execute(
                    "UPDATE addresses SET worked_last = ?2, last_err = NULL WHERE address = ?1",
                    params![address.to_string(), now_ms()],
                )?,
                Some(err) => tx.execute(
                    "UPDATE addresses SET last_err = ?2 WHERE address = ?1",
                    params![address.to_string(), err],
                )?,
            };
            Ok(updated)
        })?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
