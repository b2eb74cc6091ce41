use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::session::{Command, ContainerName, Session, SlotRef};
use crate::{Item, ItemId, Price};

/// Errors that can occur when reading a command script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized op '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    container: Option<ContainerName>,
    slot: Option<usize>,
    target: Option<ContainerName>,
    target_slot: Option<usize>,
    item: Option<ItemId>,
    price: Option<Price>,
    discount: Option<Price>,
}

/// A snapshot line: one occupied slot, or the wallet balance.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OutputRow {
    container: String,
    slot: Option<usize>,
    item: Option<ItemId>,
    price: Price,
    locked: bool,
}

impl InputRow {
    fn require<T>(&self, line: usize, value: Option<T>, field: &'static str) -> Result<T, ScriptError> {
        value.ok_or_else(|| ScriptError::MissingField {
            line,
            op: self.op.clone(),
            field,
        })
    }

    fn source(&self, line: usize) -> Result<SlotRef, ScriptError> {
        Ok(SlotRef::new(
            self.require(line, self.container, "container")?,
            self.require(line, self.slot, "slot")?,
        ))
    }

    fn target(&self, line: usize) -> Result<ContainerName, ScriptError> {
        self.require(line, self.target, "target")
    }

    fn target_slot(&self, line: usize) -> Result<SlotRef, ScriptError> {
        Ok(SlotRef::new(
            self.target(line)?,
            self.require(line, self.target_slot, "target_slot")?,
        ))
    }

    fn into_command(self, line: usize) -> Result<Command, ScriptError> {
        match self.op.as_str() {
            "fund" => Ok(Command::Fund {
                amount: self.require(line, self.price, "price")?,
            }),
            "stock" => {
                let container = self.require(line, self.container, "container")?;
                let price = self.require(line, self.price, "price")?;
                let id = self.require(line, self.item.clone(), "item")?;
                let item = match self.discount {
                    Some(discount) => Item::new(id, price).with_discount(discount),
                    None => Item::new(id, price),
                };
                Ok(Command::Stock { container, item })
            }
            "move" => Ok(Command::Move {
                from: self.source(line)?,
                to: self.target_slot(line)?,
            }),
            "quick" => Ok(Command::QuickMove {
                from: self.source(line)?,
                to: self.target(line)?,
            }),
            "drop" => Ok(Command::Drop {
                dragged: self.source(line)?,
                target: self.target_slot(line)?,
            }),
            "drop_on" => Ok(Command::DropOnContainer {
                dragged: self.source(line)?,
                target: self.target(line)?,
            }),
            "lock" | "unlock" => Ok(Command::Lock {
                slot: self.source(line)?,
                locked: self.op == "lock",
            }),
            "remove" => Ok(Command::Remove {
                slot: self.source(line)?,
            }),
            "clear" => Ok(Command::Clear {
                container: self.require(line, self.container, "container")?,
            }),
            _ => Err(ScriptError::UnrecognizedOp { line, op: self.op }),
        }
    }
}

/// Read commands from a csv script
pub fn read_script(
    path: &Path,
) -> Result<impl Iterator<Item = Result<Command, ScriptError>> + use<>, ScriptError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| ScriptError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| ScriptError::Parse { line, source })?;
            row.into_command(line)
        }))
}

/// Occupied slots of a session followed by the wallet balance
pub fn snapshot(session: &Session) -> Vec<OutputRow> {
    let mut rows: Vec<OutputRow> = session
        .occupied_slots()
        .into_iter()
        .map(|view| OutputRow {
            container: view.container.to_string(),
            slot: Some(view.index),
            item: Some(view.item.id().to_owned()),
            price: view.item.effective_price(),
            locked: view.locked,
        })
        .collect();

    rows.push(OutputRow {
        container: "wallet".to_string(),
        slot: None,
        item: None,
        price: session.funds(),
        locked: false,
    });
    rows
}

/// Write snapshot rows in csv format
pub fn write_snapshot(
    writer: impl io::Write,
    rows: impl IntoIterator<Item = OutputRow>,
) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(&row)?;
    }
    writer.flush()?;
    Ok(())
}
