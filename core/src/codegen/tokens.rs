//! Module-wide token table.
//!
//! A token is `tag << 24 | row` with rows numbered from 1 per tag. Requests
//! are memoized, so the same symbol always yields the same token, and rows are
//! only ever appended.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use static_assertions::{assert_eq_size, const_assert_eq};

use crate::error::CompileError;
use crate::symbols::{FieldId, MethodId, SymbolTable, TypeId, TypeKind};
use crate::{String, Vec, format};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token(pub u32);

assert_eq_size!(Token, u32);

const ROW_BITS: u32 = 24;
const ROW_MASK: u32 = (1 << ROW_BITS) - 1;

const_assert_eq!(ROW_MASK, 0x00FF_FFFF);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenTag {
    TypeDef = 0x02,
    Field = 0x04,
    Method = 0x06,
    MemberRef = 0x0A,
    /// Arrays and nullable wrappers.
    TypeSpec = 0x1B,
    Blob = 0x1D,
    UserString = 0x70,
}

impl TokenTag {
    const ALL: [TokenTag; 7] = [
        TokenTag::TypeDef,
        TokenTag::Field,
        TokenTag::Method,
        TokenTag::MemberRef,
        TokenTag::TypeSpec,
        TokenTag::Blob,
        TokenTag::UserString,
    ];

    fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| *tag as u8 == byte)
    }

    fn slot(self) -> usize {
        Self::ALL.iter().position(|tag| *tag == self).unwrap_or(0)
    }
}

impl Token {
    pub const fn new(tag: TokenTag, row: u32) -> Self {
        Token(((tag as u32) << ROW_BITS) | (row & ROW_MASK))
    }

    pub fn tag(self) -> Option<TokenTag> {
        TokenTag::from_byte((self.0 >> ROW_BITS) as u8)
    }

    pub const fn row(self) -> u32 {
        self.0 & ROW_MASK
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// What a token stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKey {
    Type(TypeId),
    TypeSpec(TypeId),
    Field(FieldId),
    Method(MethodId),
    /// Intrinsic member of an array or nullable type, resolved by name at
    /// load time.
    MemberRef { owner: TypeId, name: String },
    UserString(String),
    Blob(Vec<u8>),
}

impl TokenKey {
    fn tag(&self) -> TokenTag {
        match self {
            TokenKey::Type(_) => TokenTag::TypeDef,
            TokenKey::TypeSpec(_) => TokenTag::TypeSpec,
            TokenKey::Field(_) => TokenTag::Field,
            TokenKey::Method(_) => TokenTag::Method,
            TokenKey::MemberRef { .. } => TokenTag::MemberRef,
            TokenKey::UserString(_) => TokenTag::UserString,
            TokenKey::Blob(_) => TokenTag::Blob,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: Token,
    pub key: TokenKey,
}

/// Old-to-new token mapping produced by [`TokenTable::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenRemap {
    map: HashMap<Token, Token>,
}

impl TokenRemap {
    /// Tokens the merged table never issued map to themselves.
    pub fn apply(&self, token: Token) -> Token {
        self.map.get(&token).copied().unwrap_or(token)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TokenCheckpoint(usize);

#[derive(Clone, Debug, Default)]
pub struct TokenTable {
    entries: Vec<TokenEntry>,
    lookup: HashMap<TokenKey, Token>,
    rows: [u32; TokenTag::ALL.len()],
}

impl PartialEq for TokenTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in the order they were issued.
    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, token: Token) -> Option<&TokenKey> {
        self.entries
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| &entry.key)
    }

    fn intern(&mut self, key: TokenKey) -> Token {
        if let Some(token) = self.lookup.get(&key) {
            return *token;
        }
        let tag = key.tag();
        let row = &mut self.rows[tag.slot()];
        *row += 1;
        let token = Token::new(tag, *row);
        self.lookup.insert(key.clone(), token);
        self.entries.push(TokenEntry { token, key });
        token
    }

    /// Token for a type: a definition row for classes, structs, interfaces
    /// and plain primitives, a spec row for arrays and nullables.
    pub fn type_token(&mut self, symbols: &SymbolTable, ty: TypeId) -> Result<Token, CompileError> {
        let Some(def) = symbols.types().get(ty.index()) else {
            return Err(CompileError::UnresolvedSymbol(format!("type #{}", ty.0)));
        };
        let key = match def.kind {
            TypeKind::Void => return Err(CompileError::UnresolvedSymbol(String::from("void"))),
            TypeKind::Primitive(prim) if prim.is_nullable() => TokenKey::TypeSpec(ty),
            TypeKind::Array { .. } => TokenKey::TypeSpec(ty),
            _ => TokenKey::Type(ty),
        };
        Ok(self.intern(key))
    }

    pub fn field(&mut self, symbols: &SymbolTable, field: FieldId) -> Result<Token, CompileError> {
        if field.0 as usize >= symbols.fields().len() {
            return Err(CompileError::UnresolvedSymbol(format!("field #{}", field.0)));
        }
        Ok(self.intern(TokenKey::Field(field)))
    }

    pub fn method(&mut self, symbols: &SymbolTable, method: MethodId) -> Result<Token, CompileError> {
        if method.0 as usize >= symbols.methods().len() {
            return Err(CompileError::UnresolvedSymbol(format!("method #{}", method.0)));
        }
        Ok(self.intern(TokenKey::Method(method)))
    }

    pub fn member_ref(&mut self, owner: TypeId, name: &str) -> Token {
        self.intern(TokenKey::MemberRef {
            owner,
            name: String::from(name),
        })
    }

    pub fn user_string(&mut self, value: &str) -> Token {
        self.intern(TokenKey::UserString(String::from(value)))
    }

    /// Identical blobs share a row.
    pub fn blob(&mut self, bytes: Vec<u8>) -> Token {
        self.intern(TokenKey::Blob(bytes))
    }

    /// Appends every entry of `other` in order and returns where its tokens
    /// ended up in this table.
    pub fn merge(&mut self, other: &TokenTable) -> TokenRemap {
        let mut remap = TokenRemap::default();
        for entry in &other.entries {
            let token = self.intern(entry.key.clone());
            remap.map.insert(entry.token, token);
        }
        remap
    }

    pub fn checkpoint(&self) -> TokenCheckpoint {
        TokenCheckpoint(self.entries.len())
    }

    /// Forgets every token issued after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: TokenCheckpoint) {
        for entry in self.entries.drain(checkpoint.0..) {
            self.lookup.remove(&entry.key);
            if let Some(tag) = entry.token.tag() {
                self.rows[tag.slot()] -= 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tokens_test;
