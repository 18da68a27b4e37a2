/*
    Sidereal, a spacecraft mission design toolkit
    Copyright (C) 2023 Sidereal Contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::EventCondition;
use crate::cosmic::State;
use crate::errors::SiderealError;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Boolean composition of a logical condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalKind {
    And,
    Or,
}

/// `and` / `or` over child conditions.
///
/// Satisfaction is all/any of the children. The combined evaluation is the
/// minimum (for `and`) or maximum (for `or`) child evaluation, so the sign
/// tracks satisfaction and the root finder locks onto the latest (resp.
/// earliest) crossing. Near-simultaneous child crossings can blunt the root
/// finder's sensitivity through the min/max; at propagation step sizes this
/// stays well within the refinement bracket.
pub struct LogicalCondition {
    name: String,
    kind: LogicalKind,
    children: Vec<Box<dyn EventCondition>>,
}

impl LogicalCondition {
    pub fn new(
        name: &str,
        kind: LogicalKind,
        children: Vec<Box<dyn EventCondition>>,
    ) -> Result<Self, SiderealError> {
        if children.is_empty() {
            return Err(SiderealError::InvalidConfiguration(
                "a logical condition needs at least one child".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            children,
        })
    }

    pub fn kind(&self) -> LogicalKind {
        self.kind
    }

    pub fn children(&self) -> &[Box<dyn EventCondition>] {
        &self.children
    }
}

impl Clone for LogicalCondition {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            children: self.children.clone(),
        }
    }
}

impl EventCondition for LogicalCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, state: &State) -> Result<f64, SiderealError> {
        let mut combined = self.children[0].evaluate(state)?;
        for child in self.children.iter().skip(1) {
            let value = child.evaluate(state)?;
            combined = match self.kind {
                // Crosses zero when the last child crosses.
                LogicalKind::And => combined.min(value),
                // Crosses zero when the first child crosses.
                LogicalKind::Or => combined.max(value),
            };
        }
        Ok(combined)
    }

    fn is_satisfied(&self, current: &State, previous: &State) -> Result<bool, SiderealError> {
        for child in &self.children {
            let satisfied = child.is_satisfied(current, previous)?;
            match self.kind {
                LogicalKind::And if !satisfied => return Ok(false),
                LogicalKind::Or if satisfied => return Ok(true),
                _ => {}
            }
        }
        Ok(self.kind == LogicalKind::And)
    }

    fn update_target(&mut self, state: &State) -> Result<(), SiderealError> {
        for child in &mut self.children {
            child.update_target(state)?;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn EventCondition> {
        Box::new(self.clone())
    }
}

impl fmt::Display for LogicalCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self.kind {
            LogicalKind::And => "and",
            LogicalKind::Or => "or",
        };
        write!(f, "{} ({op} over {} children)", self.name, self.children.len())
    }
}
