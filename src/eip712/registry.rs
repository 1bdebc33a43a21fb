//! EIP-712 Type Registry
//!
//! Holds the struct schemas of one signing session. Schemas are stored in a
//! flat vector and addressed by index; dependency resolution walks that
//! adjacency structure with an explicit stack.
//!
//! The type-hash cache is a per-registry `OnceLock` per type, so a shared
//! `&TypeRegistry` can be hashed against from several threads.

use super::types::*;
use crate::log_debug;
use crate::utils::crypto::keccak256;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// A field with its parsed type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
}

/// A named, ordered list of fields. Field order is part of the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl TypeSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `Name(type1 name1,type2 name2,...)`
    pub fn signature(&self) -> String {
        let field_strs: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.field_type, f.name))
            .collect();
        format!("{}({})", self.name, field_strs.join(","))
    }
}

/// Session-scoped set of struct types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    schemas: Vec<TypeSchema>,
    index: HashMap<String, usize>,
    strict: bool,
    type_hashes: Vec<OnceLock<[u8; 32]>>,
}

impl Clone for TypeRegistry {
    fn clone(&self) -> Self {
        // the clone starts with an empty hash cache
        Self {
            schemas: self.schemas.clone(),
            index: self.index.clone(),
            strict: self.strict,
            type_hashes: self.schemas.iter().map(|_| OnceLock::new()).collect(),
        }
    }
}

impl TypeRegistry {
    /// Registry that allows forward references (validated at resolve time)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that requires referenced types to be registered first
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_strictness(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::new()
        }
    }

    /// Build from a name -> fields map. Types are registered in name order.
    pub fn from_types(
        types: &HashMap<String, Vec<TypedDataField>>,
        strict: bool,
    ) -> Result<Self, Eip712Error> {
        let mut registry = Self::with_strictness(strict);
        let mut names: Vec<&String> = types.keys().collect();
        names.sort();

        if strict {
            // declare-before-use: register dependencies first
            for name in registry.declaration_order(types, &names)? {
                registry.register(name, types[name].clone())?;
            }
        } else {
            for name in names {
                registry.register(name, types[name].clone())?;
            }
        }
        Ok(registry)
    }

    /// Order `names` so each type follows the types it references.
    fn declaration_order<'a>(
        &self,
        types: &'a HashMap<String, Vec<TypedDataField>>,
        names: &[&'a String],
    ) -> Result<Vec<&'a String>, Eip712Error> {
        let mut ordered: Vec<&'a String> = Vec::with_capacity(names.len());
        let mut placed: BTreeSet<&str> = BTreeSet::new();

        while ordered.len() < names.len() {
            let mut progressed = false;
            for name in names {
                if placed.contains(name.as_str()) {
                    continue;
                }
                let ready = types[*name].iter().all(|field| {
                    match FieldType::parse(&field.type_name).ok().as_ref().and_then(|t| t.struct_name()) {
                        Some(dep) => dep == name.as_str() || placed.contains(dep) || !types.contains_key(dep),
                        None => true,
                    }
                });
                if ready {
                    placed.insert(name.as_str());
                    ordered.push(*name);
                    progressed = true;
                }
            }
            if !progressed {
                // what is left references itself through other types
                let stuck = names
                    .iter()
                    .find(|n| !placed.contains(n.as_str()))
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                return Err(Eip712Error::CyclicType(stuck));
            }
        }
        Ok(ordered)
    }

    /// Add a struct type.
    ///
    /// Fails on a duplicate name, a malformed field type, or (strict mode
    /// only) a reference to a type not yet registered.
    pub fn register(&mut self, name: &str, fields: Vec<TypedDataField>) -> Result<(), Eip712Error> {
        if self.index.contains_key(name) {
            log_debug!("eip712::registry", "rejected duplicate type", type_name = name);
            return Err(Eip712Error::DuplicateType(name.to_string()));
        }
        if !is_valid_struct_name(name) {
            return Err(Eip712Error::InvalidType(format!("{}: not a valid struct name", name)));
        }

        let mut parsed = Vec::with_capacity(fields.len());
        for field in fields {
            if parsed.iter().any(|f: &FieldSchema| f.name == field.name) {
                return Err(Eip712Error::InvalidType(format!(
                    "{}: duplicate field {}",
                    name, field.name
                )));
            }
            let field_type = FieldType::parse(&field.type_name)?;
            if self.strict {
                if let Some(dep) = field_type.struct_name() {
                    if dep != name && !self.index.contains_key(dep) {
                        log_debug!("eip712::registry", "rejected undeclared reference", type_name = name, referenced = dep);
                        return Err(Eip712Error::UnknownReference {
                            type_name: name.to_string(),
                            referenced: dep.to_string(),
                        });
                    }
                }
            }
            parsed.push(FieldSchema {
                name: field.name,
                field_type,
            });
        }

        self.index.insert(name.to_string(), self.schemas.len());
        self.schemas.push(TypeSchema {
            name: name.to_string(),
            fields: parsed,
        });
        self.type_hashes.push(OnceLock::new());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn schema(&self, name: &str) -> Option<&TypeSchema> {
        self.index.get(name).map(|&i| &self.schemas[i])
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered type names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.name.as_str())
    }

    fn index_of(&self, name: &str) -> Result<usize, Eip712Error> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Eip712Error::InvalidPrimaryType(name.to_string()))
    }

    /// Root type first, then every transitively referenced type sorted by name.
    ///
    /// Rejects references to unregistered types and any cycle reachable from
    /// the root.
    pub fn resolve_dependencies(&self, root: &str) -> Result<Vec<&str>, Eip712Error> {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;

        let root_idx = self.index_of(root)?;
        let mut state = vec![UNSEEN; self.schemas.len()];
        // (type index, next field to inspect)
        let mut stack: Vec<(usize, usize)> = vec![(root_idx, 0)];
        state[root_idx] = ON_PATH;
        let mut reached: Vec<usize> = Vec::new();

        while let Some(frame) = stack.last_mut() {
            let (idx, next_field) = *frame;
            let schema = &self.schemas[idx];

            let Some(field) = schema.fields.get(next_field) else {
                state[idx] = DONE;
                reached.push(idx);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let Some(dep) = field.field_type.struct_name() else {
                continue;
            };
            let dep_idx = self.index.get(dep).copied().ok_or_else(|| Eip712Error::UnknownReference {
                type_name: schema.name.clone(),
                referenced: dep.to_string(),
            })?;

            match state[dep_idx] {
                UNSEEN => {
                    state[dep_idx] = ON_PATH;
                    stack.push((dep_idx, 0));
                }
                ON_PATH => {
                    let mut cycle: Vec<&str> = stack
                        .iter()
                        .skip_while(|(i, _)| *i != dep_idx)
                        .map(|(i, _)| self.schemas[*i].name.as_str())
                        .collect();
                    cycle.push(dep);
                    log_debug!("eip712::registry", "rejected cyclic type", root = root, cycle = cycle.join(" -> "));
                    return Err(Eip712Error::CyclicType(cycle.join(" -> ")));
                }
                _ => {}
            }
        }

        let mut others: Vec<&str> = reached
            .into_iter()
            .filter(|&i| i != root_idx)
            .map(|i| self.schemas[i].name.as_str())
            .collect();
        others.sort_unstable();

        let mut ordered = Vec::with_capacity(others.len() + 1);
        ordered.push(self.schemas[root_idx].name.as_str());
        ordered.extend(others);
        Ok(ordered)
    }

    /// `encodeType`: concatenated signatures of the root and its dependencies
    pub fn type_hash_input(&self, root: &str) -> Result<String, Eip712Error> {
        let mut result = String::new();
        for name in self.resolve_dependencies(root)? {
            let idx = self.index_of(name)?;
            result.push_str(&self.schemas[idx].signature());
        }
        Ok(result)
    }

    /// `keccak256(encodeType(root))`, memoized per type
    pub fn type_hash(&self, root: &str) -> Result<[u8; 32], Eip712Error> {
        let idx = self.index_of(root)?;
        if let Some(hash) = self.type_hashes[idx].get() {
            return Ok(*hash);
        }
        let hash = keccak256(self.type_hash_input(root)?.as_bytes());
        Ok(*self.type_hashes[idx].get_or_init(|| hash))
    }

    /// Resolve every registered type, surfacing any dangling reference or cycle.
    pub fn validate(&self) -> Result<(), Eip712Error> {
        for schema in &self.schemas {
            self.resolve_dependencies(&schema.name)?;
        }
        Ok(())
    }
}
