//! The cslice declaration model: C top-level entities, their types, and the identifiers that name
//! them within a translation unit and across a whole program.
//!
//! Everything in this crate is plain data. Instances are built once by the elaborator and are
//! read-only afterwards; declarations only ever refer to one another through [Tlid]s, so a unit
//! is a flat list even when the C types it describes are mutually recursive.

pub mod model;
pub mod symbol;

pub use model::{
    Attribute, DeclarationKind, Enumerator, FKind, Field, Fragment, FunctionType, IKind, Meta,
    Param, RecordKind, SourceLocation, SourceRange, Storage, TranslationUnit, Type, TypeKind,
    UnitDeclaration,
};
pub use symbol::{EntityKind, Symbol, Tlid, Tuid};
