use crate::ddram::{MAX_COLS, MAX_ROWS};
use crate::host::PhysicalSpace;
use crate::register::REGISTER_LIMIT;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Construction parameters of one LCD instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcdConfig {
    pub name: String,
    pub rows: usize,
    #[serde(alias = "columns")]
    pub cols: usize,
    /// Physical address of the data register; control follows at +1.
    #[serde(alias = "register")]
    pub address: u64,
}

impl LcdConfig {
    pub fn new(name: impl Into<String>, rows: usize, cols: usize, address: u64) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
            address,
        }
    }

    /// Parses `init` arguments: `<name> <rows> <columns> <register>`.
    pub fn from_tokens<T: AsRef<str>>(tokens: &[T]) -> Result<Self> {
        let mut args = tokens.iter().map(|token| token.as_ref());
        let name = args.next().ok_or(CoreError::MissingParameter("name"))?;
        let rows = next_uint(&mut args, "rows")?;
        let cols = next_uint(&mut args, "columns")?;
        let address = next_uint(&mut args, "register")?;
        if let Some(extra) = args.next() {
            return Err(CoreError::UnexpectedParameter(extra.to_string()));
        }
        let rows = usize::try_from(rows).unwrap_or(usize::MAX);
        let cols = usize::try_from(cols).unwrap_or(usize::MAX);
        Ok(Self::new(name, rows, cols, address))
    }

    pub fn validate(&self, space: &dyn PhysicalSpace) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidParameter {
                name: "name",
                value: self.name.clone(),
            });
        }
        if !(1..=MAX_ROWS).contains(&self.rows) {
            return Err(CoreError::Geometry {
                what: "rows",
                value: self.rows as u64,
                max: MAX_ROWS,
            });
        }
        if !(1..=MAX_COLS).contains(&self.cols) {
            return Err(CoreError::Geometry {
                what: "columns",
                value: self.cols as u64,
                max: MAX_COLS,
            });
        }
        if !space.contains(self.address) {
            return Err(CoreError::AddressOutOfRange(self.address));
        }
        match self.address.checked_add(REGISTER_LIMIT) {
            Some(end) if space.contains(end) => Ok(()),
            _ => Err(CoreError::RegisterBlockOverflow(self.address)),
        }
    }
}

fn next_uint<'a>(args: &mut impl Iterator<Item = &'a str>, name: &'static str) -> Result<u64> {
    let raw = args.next().ok_or(CoreError::MissingParameter(name))?;
    parse_uint(raw).ok_or_else(|| CoreError::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}

/// Unsigned integer in decimal, `0x` hex, `0o` octal or `0b` binary; `_` separators allowed.
pub fn parse_uint(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|&ch| ch != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
