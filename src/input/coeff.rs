//! Coefficient manifests: the group operators to build.
//!
//! Format (whitespace-separated, line breaks are not significant):
//! <num_ops>
//! <num_terms> <name>
//! <spin_l> <spin_r> <disp_l> <disp_r> (<re>,<im>)     # repeated num_terms times
//!
//! Example:
//! 1
//! 2 pion_A1
//! 1 1 0 0 (2.0,0.0)
//! 2 1 0 0 (-1.0,0.0)

use crate::Result;
use crate::error::MesonOpsError;
use crate::input::key::{OperatorKey, QuarkInfo};

use anyhow::{Context, bail};
use num_complex::Complex64;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::str::FromStr;
use tracing::{debug, info};

/// One weighted elemental operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    #[serde(rename = "ElementalOperator")]
    pub key: OperatorKey,
    #[serde(rename = "Coefficient")]
    pub coeff: Complex64,
}

/// A group-theoretical operator: a name plus terms in manifest order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMesonOperator {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Terms")]
    pub terms: Vec<Term>,
}

/// Read every manifest in order and concatenate their operators.
///
/// Operator names must be unique across all files because they name the
/// output files.
pub fn read_coeff_files(paths: &[String]) -> Result<Vec<GroupMesonOperator>> {
    let mut ops: Vec<GroupMesonOperator> = Vec::new();
    for path in paths {
        let text =
            fs::read_to_string(path).with_context(|| format!("read coefficient file {}", path))?;
        let parsed = parse_coeff_text(path, &text)?;
        debug!(file = %path, ops = parsed.len(), "read coefficient file");
        ops.extend(parsed);
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for op in &ops {
        if !seen.insert(op.name.as_str()) {
            bail!(MesonOpsError::DuplicateOperatorName(op.name.clone()));
        }
    }

    info!(nops = ops.len(), files = paths.len(), "coefficient files read");
    Ok(ops)
}

/// Parse the text of one manifest. `path` is only used in error messages.
pub fn parse_coeff_text(path: &str, text: &str) -> Result<Vec<GroupMesonOperator>> {
    let mut sc = Scanner::new(path, text)?;

    let nops: usize = sc.parse("operator count")?;
    let mut ops = Vec::new();

    for _ in 0..nops {
        let nterms: usize = sc.parse("term count")?;
        let name = sc.token("operator name")?.to_string();
        if nterms == 0 {
            return Err(sc.error(format!("operator '{}' has no terms", name)));
        }

        let mut terms = Vec::new();
        for _ in 0..nterms {
            let spin_l: i32 = sc.parse("spin_l")?;
            let spin_r: i32 = sc.parse("spin_r")?;
            let disp_l: i32 = sc.parse("displacement_l")?;
            let disp_r: i32 = sc.parse("displacement_r")?;
            let coeff = sc.complex()?;

            terms.push(Term {
                key: OperatorKey::new(
                    QuarkInfo::new(spin_l, disp_l),
                    QuarkInfo::new(spin_r, disp_r),
                ),
                coeff,
            });
        }

        ops.push(GroupMesonOperator { name, terms });
    }

    if !sc.at_end() {
        return Err(sc.error(format!(
            "unexpected trailing content after {} operators",
            nops
        )));
    }

    Ok(ops)
}

/// Cursor over the manifest text.
struct Scanner<'a> {
    path: &'a str,
    text: &'a str,
    pos: usize,
    complex_re: Regex,
}

impl<'a> Scanner<'a> {
    fn new(path: &'a str, text: &'a str) -> Result<Self> {
        // "(re,im)", blanks allowed around the parts; comma is required.
        let complex_re = Regex::new(r"\A\(\s*([^\s,()]+)\s*,\s*([^\s,()]+)\s*\)")?;
        Ok(Self {
            path,
            text,
            pos: 0,
            complex_re,
        })
    }

    fn line(&self) -> usize {
        self.text[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, reason: String) -> anyhow::Error {
        MesonOpsError::ManifestParse {
            path: self.path.to_string(),
            line: self.line(),
            reason,
        }
        .into()
    }

    fn skip_ws(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.text.len()
    }

    fn token(&mut self, what: &str) -> Result<&'a str> {
        self.skip_ws();
        let rest = &self.text[self.pos..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error(format!("unexpected end of file, expected {}", what)));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let tok = self.token(what)?;
        tok.parse::<T>()
            .map_err(|_| self.error(format!("cannot parse {} from {:?}", what, tok)))
    }

    fn complex(&mut self) -> Result<Complex64> {
        self.skip_ws();
        let rest = &self.text[self.pos..];
        let caps = match self.complex_re.captures(rest) {
            Some(c) => c,
            None => {
                let shown: String = rest.chars().take(24).collect();
                return Err(self.error(format!(
                    "expected complex coefficient (re,im), found {:?}",
                    shown
                )));
            }
        };

        let re_str = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let im_str = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let re: f64 = re_str
            .parse()
            .map_err(|_| self.error(format!("bad real part {:?}", re_str)))?;
        let im: f64 = im_str
            .parse()
            .map_err(|_| self.error(format!("bad imaginary part {:?}", im_str)))?;

        self.pos += caps.get(0).map(|m| m.end()).unwrap_or(0);
        Ok(Complex64::new(re, im))
    }
}
