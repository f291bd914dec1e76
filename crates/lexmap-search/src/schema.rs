//! Record schema: property to document-field bindings.
//!
//! A record type describes its properties once through [`Record::describe`].
//! [`resolve_bindings`] turns that description into the ordered list of
//! [`FieldBinding`]s, and [`SchemaCache`] memoizes the result per type.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::codec::{FieldKind, FieldType, FieldValue};
use crate::error::{CodecError, SchemaError};

/// Suffix of the analyzed copy of a field.
pub const ANALYSIS_SUFFIX: &str = "-analysis";

/// Prefix of the spatial fields derived from a geo property.
pub const SPATIAL_PREFIX: &str = "pvs_";

/// Identity field written for records that declare no identity property.
pub const IMPLICIT_ID_FIELD: &str = "entityId";

/// How a property is represented in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Stored verbatim and indexed for free-text search
    Analyzed,
    /// Stored and indexed as a single untokenized value
    Stored,
    /// Never written to the document
    NoIndex,
    /// Stored, plus spatial fields for area search
    Geo,
}

/// Declarative marker a record attaches to a property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldMarker {
    /// No marker: stored under the property name
    #[default]
    Unmarked,
    Analyzed(Option<String>),
    Stored(Option<String>),
    Geo,
    NoIndex,
}

/// Static description of one record property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub property: String,
    pub marker: FieldMarker,
    pub kind: FieldKind,
}

/// Resolved mapping of one property onto document fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub property: String,
    pub field_name: String,
    pub role: FieldRole,
    pub kind: FieldKind,
    /// `<field>-analysis`, present for analyzed properties
    pub analysis_name: Option<String>,
    /// `pvs_<property>`, present for the geo property
    pub spatial_prefix: Option<String>,
}

impl FieldBinding {
    /// Field searched by free-text clauses (term, like, fuzzy).
    pub fn text_field(&self) -> &str {
        self.analysis_name.as_deref().unwrap_or(&self.field_name)
    }

    /// Field matched by exact, range and sort operations.
    pub fn raw_field(&self) -> &str {
        &self.field_name
    }

    pub fn is_identity(&self) -> bool {
        self.kind == FieldKind::Identity
    }
}

/// Resolve property descriptors into ordered field bindings.
///
/// No-index properties are dropped. Two geo properties, two identities, or
/// two bindings writing the same document field are rejected.
pub fn resolve_bindings(
    record: &str,
    properties: &[PropertyDescriptor],
) -> Result<Vec<FieldBinding>, SchemaError> {
    let mut bindings: Vec<FieldBinding> = Vec::with_capacity(properties.len());
    let mut geo: Option<&str> = None;
    let mut identity: Option<&str> = None;
    let mut field_names: HashSet<String> = HashSet::new();

    for descriptor in properties {
        let property = descriptor.property.as_str();
        let (role, field_name) = match &descriptor.marker {
            FieldMarker::NoIndex => continue,
            FieldMarker::Analyzed(name) => (FieldRole::Analyzed, name.as_deref()),
            FieldMarker::Stored(name) => (FieldRole::Stored, name.as_deref()),
            FieldMarker::Geo => (FieldRole::Geo, None),
            FieldMarker::Unmarked => (FieldRole::Stored, None),
        };
        let field_name = field_name.unwrap_or(property).to_string();

        if role == FieldRole::Geo {
            if descriptor.kind != FieldKind::Geo {
                return Err(SchemaError::GeoKind {
                    record: record.to_string(),
                    property: property.to_string(),
                    kind: descriptor.kind,
                });
            }
            if let Some(first) = geo {
                return Err(SchemaError::DuplicateGeo {
                    record: record.to_string(),
                    first: first.to_string(),
                    second: property.to_string(),
                });
            }
            geo = Some(property);
        }

        if descriptor.kind == FieldKind::Identity {
            if let Some(first) = identity {
                return Err(SchemaError::DuplicateIdentity {
                    record: record.to_string(),
                    first: first.to_string(),
                    second: property.to_string(),
                });
            }
            identity = Some(property);
        }

        let analysis_name =
            (role == FieldRole::Analyzed).then(|| format!("{field_name}{ANALYSIS_SUFFIX}"));
        let spatial_prefix = (role == FieldRole::Geo).then(|| format!("{SPATIAL_PREFIX}{property}"));

        let mut produced = vec![field_name.clone()];
        produced.extend(analysis_name.iter().cloned());
        produced.extend(spatial_prefix.iter().cloned());
        for name in produced {
            if !field_names.insert(name.clone()) {
                return Err(SchemaError::DuplicateField {
                    record: record.to_string(),
                    field: name,
                });
            }
        }

        bindings.push(FieldBinding {
            property: property.to_string(),
            field_name,
            role,
            kind: descriptor.kind,
            analysis_name,
            spatial_prefix,
        });
    }

    // without an identity property the implicit id field is reserved
    if identity.is_none() && field_names.contains(IMPLICIT_ID_FIELD) {
        return Err(SchemaError::DuplicateField {
            record: record.to_string(),
            field: IMPLICIT_ID_FIELD.to_string(),
        });
    }

    Ok(bindings)
}

type ReadFn<T> = Box<dyn Fn(&T) -> Result<Option<FieldValue>, CodecError> + Send + Sync>;
type WriteFn<T> = Box<dyn Fn(&mut T, FieldValue) -> Result<(), CodecError> + Send + Sync>;

struct Accessor<T> {
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T: 'static> Accessor<T> {
    fn new<V: FieldType>(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self {
            read: Box::new(move |record| get(record).to_field_value()),
            write: Box::new(move |record, value| {
                *get_mut(record) = V::from_field_value(value)?;
                Ok(())
            }),
        }
    }
}

/// Collects a record's property declarations.
pub struct SchemaBuilder<T> {
    properties: Vec<(PropertyDescriptor, Option<Accessor<T>>)>,
}

impl<T: Record> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Declare a property with an explicit marker.
    pub fn property<V: FieldType>(
        &mut self,
        property: &str,
        marker: FieldMarker,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        let descriptor = PropertyDescriptor {
            property: property.to_string(),
            marker,
            kind: V::KIND,
        };
        self.properties
            .push((descriptor, Some(Accessor::new(get, get_mut))));
        self
    }

    /// Unmarked property, stored under its own name.
    pub fn field<V: FieldType>(
        &mut self,
        property: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.property(property, FieldMarker::Unmarked, get, get_mut)
    }

    pub fn analyzed<V: FieldType>(
        &mut self,
        property: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.property(property, FieldMarker::Analyzed(None), get, get_mut)
    }

    pub fn analyzed_as<V: FieldType>(
        &mut self,
        property: &str,
        field_name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        let marker = FieldMarker::Analyzed(Some(field_name.to_string()));
        self.property(property, marker, get, get_mut)
    }

    pub fn stored<V: FieldType>(
        &mut self,
        property: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.property(property, FieldMarker::Stored(None), get, get_mut)
    }

    pub fn stored_as<V: FieldType>(
        &mut self,
        property: &str,
        field_name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        let marker = FieldMarker::Stored(Some(field_name.to_string()));
        self.property(property, marker, get, get_mut)
    }

    pub fn geo<V: FieldType>(
        &mut self,
        property: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.property(property, FieldMarker::Geo, get, get_mut)
    }

    /// Property that is never written to the document.
    pub fn no_index(&mut self, property: &str) -> &mut Self {
        let descriptor = PropertyDescriptor {
            property: property.to_string(),
            marker: FieldMarker::NoIndex,
            kind: FieldKind::Structured,
        };
        self.properties.push((descriptor, None));
        self
    }
}

/// A typed record that can be indexed and searched.
pub trait Record: Default + Send + Sync + 'static {
    /// Declare the record's properties and their markers.
    fn describe(schema: &mut SchemaBuilder<Self>);

    /// Name of the index holding records of this type.
    fn index_name() -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Receives the distance from the search center (km) on area searches.
    fn set_distance(&mut self, _distance_km: f64) {}
}

/// Resolved schema of a record type, with typed accessors per binding.
pub struct RecordSchema<T> {
    name: String,
    bindings: Vec<FieldBinding>,
    accessors: Vec<Accessor<T>>,
    identity: Option<usize>,
    geo: Option<usize>,
}

impl<T: Record> RecordSchema<T> {
    /// Run the record's description and resolve it.
    pub fn build() -> Result<Self, SchemaError> {
        let mut builder = SchemaBuilder::<T>::new();
        T::describe(&mut builder);

        let name = T::index_name();
        let descriptors: Vec<PropertyDescriptor> = builder
            .properties
            .iter()
            .map(|(descriptor, _)| descriptor.clone())
            .collect();
        let bindings = resolve_bindings(&name, &descriptors)?;

        // bindings keep declaration order and skip exactly the no-index entries
        let accessors: Vec<Accessor<T>> = builder
            .properties
            .into_iter()
            .filter(|(descriptor, _)| descriptor.marker != FieldMarker::NoIndex)
            .filter_map(|(_, accessor)| accessor)
            .collect();

        let identity = bindings.iter().position(FieldBinding::is_identity);
        let geo = bindings.iter().position(|b| b.role == FieldRole::Geo);

        debug!(record = %name, fields = bindings.len(), "Resolved record schema");

        Ok(Self {
            name,
            bindings,
            accessors,
            identity,
            geo,
        })
    }

    /// Index name of the record type.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    /// Binding of a declared property.
    pub fn binding(&self, property: &str) -> Result<&FieldBinding, SchemaError> {
        self.bindings
            .iter()
            .find(|b| b.property == property)
            .ok_or_else(|| SchemaError::UnknownProperty {
                record: self.name.clone(),
                property: property.to_string(),
            })
    }

    pub fn identity(&self) -> Option<&FieldBinding> {
        self.identity.map(|i| &self.bindings[i])
    }

    /// Document field holding the record identity.
    pub fn identity_field(&self) -> &str {
        self.identity()
            .map(|b| b.field_name.as_str())
            .unwrap_or(IMPLICIT_ID_FIELD)
    }

    pub fn geo(&self) -> Option<&FieldBinding> {
        self.geo.map(|i| &self.bindings[i])
    }

    /// Read the value of binding `index` from `record`.
    pub(crate) fn read(&self, index: usize, record: &T) -> Result<Option<FieldValue>, CodecError> {
        (self.accessors[index].read)(record)
    }

    /// Write a decoded value into binding `index` of `record`.
    pub(crate) fn write(&self, index: usize, record: &mut T, value: FieldValue) -> Result<(), CodecError> {
        (self.accessors[index].write)(record, value)
    }

    pub(crate) fn identity_index(&self) -> Option<usize> {
        self.identity
    }
}

/// Per-type memo of resolved schemas.
///
/// Resolution runs without holding the lock; the first result published for
/// a type wins and later racers adopt it.
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by [`resolve`].
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    pub fn resolve<T: Record>(&self) -> Result<Arc<RecordSchema<T>>, SchemaError> {
        if let Some(schema) = self.lookup::<T>() {
            return Ok(schema);
        }

        let computed = Arc::new(RecordSchema::<T>::build()?);
        let published = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries
                .entry(TypeId::of::<T>())
                .or_insert_with(|| computed.clone() as Arc<dyn Any + Send + Sync>)
                .clone()
        };
        Ok(published.downcast::<RecordSchema<T>>().unwrap_or(computed))
    }

    /// Drop the cached schema of `T`; returns whether one was cached.
    pub fn invalidate<T: Record>(&self) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T: Record>(&self) -> Option<Arc<RecordSchema<T>>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<RecordSchema<T>>().ok())
    }
}

/// Resolve the schema of `T` through the process-wide cache.
pub fn resolve<T: Record>() -> Result<Arc<RecordSchema<T>>, SchemaError> {
    SchemaCache::global().resolve::<T>()
}
