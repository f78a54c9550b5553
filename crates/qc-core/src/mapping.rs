//! Mapping metadata: which tables back which types
//!
//! The compiler consumes mapping information through the read-only
//! [`MetaModel`] trait. [`MappingModel`] is the YAML-backed implementation
//! used by the CLI and by tests.
//!
//! ```yaml
//! types:
//!   - name: Customer
//!     table: dbo.Customers
//!     members:
//!       - { name: Id, ty: { type: scalar, kind: int32 }, primary_key: true, db_generated: true }
//!       - { name: City, ty: { type: scalar, kind: string, nullable: true } }
//!     associations:
//!       - { name: Orders, other_type: Order, this_key: [Id], other_key: [CustomerId], many: true }
//! ```

use crate::error::{CoreError, CoreResult};
use crate::names::{MemberName, TypeName};
use crate::types::ValueType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// A persistent data member of a mapped type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaDataMember {
    /// Member name on the host type
    pub name: MemberName,
    /// Column name; defaults to the member name
    #[serde(default)]
    pub column: Option<String>,
    /// Host type of the member
    pub ty: ValueType,
    /// Explicit database type, e.g. `NVarChar(40) NOT NULL`
    #[serde(default)]
    pub db_type: Option<String>,
    /// Part of the identity (primary key)
    #[serde(default)]
    pub primary_key: bool,
    /// Value produced by the database (identity, computed, defaulted)
    #[serde(default)]
    pub db_generated: bool,
    /// Row-version member used for optimistic concurrency
    #[serde(default)]
    pub version: bool,
    /// Inheritance discriminator
    #[serde(default)]
    pub discriminator: bool,
    /// Overrides nullability derived from `ty`
    #[serde(default)]
    pub can_be_null: Option<bool>,
}

impl MetaDataMember {
    /// Column name in the table
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(self.name.as_str())
    }

    /// Whether the column may hold NULL
    pub fn is_nullable(&self) -> bool {
        self.can_be_null.unwrap_or_else(|| self.ty.is_nullable())
    }
}

/// An association between two mapped types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaAssociation {
    /// Member name of the association on this type
    pub name: MemberName,
    /// Type on the other end
    pub other_type: TypeName,
    /// Key members on this type; defaults to this type's identity
    #[serde(default)]
    pub this_key: Vec<MemberName>,
    /// Key members on the other type; defaults to the other type's identity
    #[serde(default)]
    pub other_key: Vec<MemberName>,
    /// To-many association
    #[serde(default)]
    pub many: bool,
    /// This side holds the foreign key
    #[serde(default)]
    pub foreign_key: bool,
}

/// A mapped type, possibly part of an inheritance hierarchy
///
/// After loading, `members` and `associations` include inherited entries
/// (base type first) and `root`/`table`/`derived` are filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaType {
    pub name: TypeName,
    /// Table name; required on hierarchy roots
    #[serde(default)]
    pub table: Option<String>,
    /// Base type in an inheritance hierarchy
    #[serde(default)]
    pub base: Option<TypeName>,
    /// Discriminator value identifying this type
    #[serde(default)]
    pub inheritance_code: Option<Value>,
    /// Type used when the discriminator matches no code
    #[serde(default)]
    pub is_inheritance_default: bool,
    #[serde(default)]
    pub members: Vec<MetaDataMember>,
    #[serde(default)]
    pub associations: Vec<MetaAssociation>,
    /// Hierarchy root (filled in on load)
    #[serde(skip)]
    pub root: Option<TypeName>,
    /// All transitively derived types (filled in on load)
    #[serde(skip)]
    pub derived: Vec<TypeName>,
}

impl MetaType {
    /// Root of the inheritance hierarchy (self when not derived)
    pub fn root_name(&self) -> &TypeName {
        self.root.as_ref().unwrap_or(&self.name)
    }

    /// Data member by name
    pub fn member(&self, name: &str) -> Option<&MetaDataMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Association by name
    pub fn association(&self, name: &str) -> Option<&MetaAssociation> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Primary key members, in declaration order
    pub fn identity_members(&self) -> Vec<&MetaDataMember> {
        self.members.iter().filter(|m| m.primary_key).collect()
    }

    /// The discriminator member, if any
    pub fn discriminator(&self) -> Option<&MetaDataMember> {
        self.members.iter().find(|m| m.discriminator)
    }

    /// True when the type participates in an inheritance hierarchy
    pub fn has_inheritance(&self) -> bool {
        self.base.is_some() || !self.derived.is_empty()
    }
}

/// Kind of mapped database function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Scalar user-defined function
    Scalar,
    /// Table-valued function (composable)
    TableValued,
    /// Stored procedure
    Procedure,
}

/// A parameter of a mapped function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaParameter {
    pub name: String,
    pub ty: ValueType,
    /// Explicit provider type; arguments are converted to it
    #[serde(default)]
    pub db_type: Option<String>,
}

/// A mapped database function or stored procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaFunction {
    /// Name used by calls (`Declaring::Mapped { function }`)
    pub name: String,
    /// Name in the database
    pub db_name: String,
    pub kind: FunctionKind,
    #[serde(default)]
    pub parameters: Vec<MetaParameter>,
    /// Scalar result type, or `Sequence<row>` for table results
    pub returns: ValueType,
    /// Whether calls may be composed into larger queries
    #[serde(default = "default_true")]
    pub composable: bool,
}

fn default_true() -> bool {
    true
}

/// Read-only mapping lookup consumed by the compiler
pub trait MetaModel {
    /// Mapping for a type, `None` for unmapped types
    fn meta_type(&self, name: &TypeName) -> Option<&MetaType>;

    /// Mapped function by call name
    fn function(&self, name: &str) -> Option<&MetaFunction>;

    /// True when `sub` is `base` or derives from it
    fn is_assignable(&self, sub: &TypeName, base: &TypeName) -> bool {
        let mut current = Some(sub.clone());
        while let Some(name) = current {
            if &name == base {
                return true;
            }
            current = self.meta_type(&name).and_then(|t| t.base.clone());
        }
        false
    }

    /// Every type of the hierarchy rooted at `root`, root first
    fn hierarchy(&self, root: &TypeName) -> Vec<&MetaType> {
        let Some(root_type) = self.meta_type(root) else {
            return Vec::new();
        };
        let mut out = vec![root_type];
        out.extend(root_type.derived.iter().filter_map(|d| self.meta_type(d)));
        out
    }

    /// Table name backing a type (through its hierarchy root)
    fn table_name(&self, name: &TypeName) -> Option<&str> {
        let ty = self.meta_type(name)?;
        self.meta_type(ty.root_name())?.table.as_deref()
    }
}

/// Raw file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingFile {
    #[serde(default)]
    types: Vec<MetaType>,
    #[serde(default)]
    functions: Vec<MetaFunction>,
}

/// YAML-backed mapping model
#[derive(Debug, Clone, Default)]
pub struct MappingModel {
    types: BTreeMap<TypeName, MetaType>,
    functions: BTreeMap<String, MetaFunction>,
}

impl MappingModel {
    /// Load a mapping file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::MappingNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a mapping from YAML text
    pub fn from_yaml(yaml: &str) -> CoreResult<Self> {
        let file: MappingFile =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::MappingParseError {
                message: e.to_string(),
            })?;
        Self::from_parts(file.types, file.functions)
    }

    /// Build and resolve a model from type and function definitions
    pub fn from_parts(types: Vec<MetaType>, functions: Vec<MetaFunction>) -> CoreResult<Self> {
        let mut declared: BTreeMap<TypeName, MetaType> = BTreeMap::new();
        for t in types {
            if declared.contains_key(&t.name) {
                return Err(CoreError::MappingInvalid {
                    type_name: t.name.to_string(),
                    reason: "duplicate type".to_string(),
                });
            }
            declared.insert(t.name.clone(), t);
        }

        let mut resolved = BTreeMap::new();
        for name in declared.keys() {
            let ty = resolve_type(&declared, name)?;
            resolved.insert(name.clone(), ty);
        }

        // derived lists
        let names: Vec<TypeName> = resolved.keys().cloned().collect();
        for name in &names {
            let mut base = resolved.get(name).and_then(|t| t.base.clone());
            while let Some(b) = base {
                let next = match resolved.get_mut(&b) {
                    Some(bt) => {
                        bt.derived.push(name.clone());
                        bt.base.clone()
                    }
                    None => None,
                };
                base = next;
            }
        }

        let mut model = MappingModel {
            types: resolved,
            functions: functions.into_iter().map(|f| (f.name.clone(), f)).collect(),
        };
        model.resolve_associations()?;
        model.validate()?;
        log::debug!(
            "Loaded mapping with {} types and {} functions",
            model.types.len(),
            model.functions.len()
        );
        Ok(model)
    }

    /// All mapped types
    pub fn types(&self) -> impl Iterator<Item = &MetaType> {
        self.types.values()
    }

    fn resolve_associations(&mut self) -> CoreResult<()> {
        let snapshot = self.types.clone();
        for ty in self.types.values_mut() {
            for assoc in ty.associations.iter_mut() {
                let other = snapshot.get(&assoc.other_type).ok_or_else(|| {
                    CoreError::MappingInvalid {
                        type_name: ty.name.to_string(),
                        reason: format!(
                            "association '{}' targets unmapped type '{}'",
                            assoc.name, assoc.other_type
                        ),
                    }
                })?;
                if assoc.this_key.is_empty() {
                    assoc.this_key = ty
                        .members
                        .iter()
                        .filter(|m| m.primary_key)
                        .map(|m| m.name.clone())
                        .collect();
                }
                if assoc.other_key.is_empty() {
                    assoc.other_key = other
                        .identity_members()
                        .into_iter()
                        .map(|m| m.name.clone())
                        .collect();
                }
                if assoc.this_key.len() != assoc.other_key.len() {
                    return Err(CoreError::MappingInvalid {
                        type_name: ty.name.to_string(),
                        reason: format!(
                            "association '{}' has {} this-key members but {} other-key members",
                            assoc.name,
                            assoc.this_key.len(),
                            assoc.other_key.len()
                        ),
                    });
                }
                for k in &assoc.other_key {
                    if other.member(k.as_str()).is_none() {
                        return Err(CoreError::UnmappedMember {
                            type_name: other.name.to_string(),
                            member: k.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> CoreResult<()> {
        for ty in self.types.values() {
            if ty.base.is_none() && ty.table.is_none() {
                return Err(CoreError::MappingInvalid {
                    type_name: ty.name.to_string(),
                    reason: "root type has no table".to_string(),
                });
            }
            if ty.base.is_none() && ty.identity_members().is_empty() {
                log::warn!("Type '{}' has no primary key members", ty.name);
            }
            let mut seen = HashSet::new();
            for m in &ty.members {
                if !seen.insert(m.name.as_str()) {
                    return Err(CoreError::MappingInvalid {
                        type_name: ty.name.to_string(),
                        reason: format!("duplicate member '{}'", m.name),
                    });
                }
            }
            for assoc in &ty.associations {
                for k in &assoc.this_key {
                    if ty.member(k.as_str()).is_none() {
                        return Err(CoreError::UnmappedMember {
                            type_name: ty.name.to_string(),
                            member: k.to_string(),
                        });
                    }
                }
            }
            if ty.has_inheritance() {
                let root = self.types.get(ty.root_name());
                if root.and_then(|r| r.discriminator()).is_none() {
                    return Err(CoreError::MappingInvalid {
                        type_name: ty.name.to_string(),
                        reason: "inheritance hierarchy has no discriminator member".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Resolve inherited members, associations and root for one type
fn resolve_type(declared: &BTreeMap<TypeName, MetaType>, name: &TypeName) -> CoreResult<MetaType> {
    let mut chain = Vec::new();
    let mut current = Some(name.clone());
    let mut visited = HashSet::new();
    while let Some(n) = current {
        if !visited.insert(n.clone()) {
            return Err(CoreError::MappingInvalid {
                type_name: name.to_string(),
                reason: "inheritance cycle".to_string(),
            });
        }
        let t = declared.get(&n).ok_or_else(|| CoreError::MappingInvalid {
            type_name: name.to_string(),
            reason: format!("unknown base type '{n}'"),
        })?;
        current = t.base.clone();
        chain.push(t);
    }

    let own = chain[0];
    let root = chain[chain.len() - 1];
    let mut members = Vec::new();
    let mut associations = Vec::new();
    for t in chain.iter().rev() {
        members.extend(t.members.iter().cloned());
        associations.extend(t.associations.iter().cloned());
    }

    Ok(MetaType {
        name: own.name.clone(),
        table: root.table.clone(),
        base: own.base.clone(),
        inheritance_code: own.inheritance_code.clone(),
        is_inheritance_default: own.is_inheritance_default,
        members,
        associations,
        root: Some(root.name.clone()),
        derived: Vec::new(),
    })
}

impl MetaModel for MappingModel {
    fn meta_type(&self, name: &TypeName) -> Option<&MetaType> {
        self.types.get(name)
    }

    fn function(&self, name: &str) -> Option<&MetaFunction> {
        self.functions.get(name)
    }
}

#[cfg(test)]
#[path = "mapping_test.rs"]
mod tests;
