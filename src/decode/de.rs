use bstr::{BString, ByteSlice};
use indexmap::IndexMap;
use indexmap::map::Entry as MapEntry;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::forward_to_deserialize_any;

use super::{DecodeOptions, conversion};
use crate::ast::{Block, Document, List, Node, Pair, Position, Str, Value};
use crate::error::{Result, XonError};

/// A block's children grouped by key. Same-named blocks are collected in source
/// order so they can decode as a list.
enum Entry<'de> {
    Pair(&'de Pair),
    Blocks(Vec<&'de Block>),
}

impl<'de> Entry<'de> {
    fn key(&self) -> &'de Str {
        match self {
            Entry::Pair(pair) => {
                let pair: &'de Pair = *pair;
                &pair.key
            }
            Entry::Blocks(blocks) => {
                let block: &'de Block = blocks[0];
                &block.name
            }
        }
    }

    fn position(&self) -> Position {
        match self {
            Entry::Pair(pair) => pair.value.position(),
            Entry::Blocks(blocks) => blocks[0].position(),
        }
    }
}

fn unversioned(children: &[Node]) -> impl Iterator<Item = &Node> {
    children
        .iter()
        .filter(|node| !matches!(node, Node::Block(Block { version: Some(_), .. })))
}

fn group(children: &[Node]) -> IndexMap<&BString, Entry<'_>> {
    let mut entries: IndexMap<&BString, Entry> = IndexMap::new();
    for node in unversioned(children) {
        match node {
            Node::Pair(pair) => {
                entries.insert(&pair.key.value, Entry::Pair(pair));
            }
            Node::Block(block) => match entries.entry(&block.name.value) {
                MapEntry::Occupied(mut slot) => {
                    if let Entry::Blocks(blocks) = slot.get_mut() {
                        blocks.push(block);
                    } else {
                        slot.insert(Entry::Blocks(vec![block]));
                    }
                }
                MapEntry::Vacant(slot) => {
                    slot.insert(Entry::Blocks(vec![block]));
                }
            },
        }
    }
    entries
}

/// Dispatch a value to the deserializer for its shape. Errors without a
/// position get the value's.
fn deserialize_value<'de, S>(seed: S, value: &'de Value, options: DecodeOptions) -> Result<S::Value>
where
    S: DeserializeSeed<'de>,
{
    match value {
        Value::Str(s) => seed.deserialize(StrDeserializer { s }),
        Value::List(list) => seed.deserialize(ListDeserializer { list, options }),
    }
    .map_err(|e| e.with_context(None, value.position()))
}

pub(crate) fn from_value<'de, T>(value: &'de Value, options: DecodeOptions) -> Result<T>
where
    T: de::Deserialize<'de>,
{
    deserialize_value(std::marker::PhantomData::<T>, value, options)
}

pub(crate) fn from_blocks<'de, T>(blocks: Vec<&'de Block>, options: DecodeOptions) -> Result<T>
where
    T: de::Deserialize<'de>,
{
    T::deserialize(BlocksDeserializer { blocks, options })
}

/// Deserializer over the children of one block, or of the whole document.
pub struct BlockDeserializer<'de> {
    children: &'de [Node],
    position: Position,
    options: DecodeOptions,
}

impl<'de> BlockDeserializer<'de> {
    pub fn document(document: &'de Document, options: DecodeOptions) -> Self {
        BlockDeserializer { children: &document.nodes, position: Position::START, options }
    }

    pub fn block(block: &'de Block, options: DecodeOptions) -> Self {
        BlockDeserializer { children: &block.children, position: block.position(), options }
    }

    fn visit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let access = BlockAccess {
            entries: group(self.children).into_iter(),
            pending: None,
            options: self.options,
        };
        visitor.visit_map(access).map_err(|e| e.with_context(None, self.position))
    }

    fn check_fields(&self, fields: &'static [&'static str]) -> Result<()> {
        for node in unversioned(self.children) {
            let key = node.key();
            if !key.to_str().is_some_and(|k| fields.iter().any(|f| *f == k)) {
                let err: XonError = de::Error::unknown_field(&key.display(), fields);
                return Err(err.with_context(None, key.position));
            }
        }
        Ok(())
    }
}

impl<'de> Deserializer<'de> for BlockDeserializer<'de> {
    type Error = XonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if self.options.strict {
            self.check_fields(fields)?;
        }
        self.visit(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map enum identifier
    }
}

struct BlockAccess<'de> {
    entries: indexmap::map::IntoIter<&'de BString, Entry<'de>>,
    pending: Option<Entry<'de>>,
    options: DecodeOptions,
}

impl<'de> MapAccess<'de> for BlockAccess<'de> {
    type Error = XonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some((_, entry)) = self.entries.next() else {
            return Ok(None);
        };
        let key = entry.key();
        let out = seed
            .deserialize(StrDeserializer { s: key })
            .map_err(|e| e.with_context(Some(key.display().as_str()), key.position))?;
        self.pending = Some(entry);
        Ok(Some(out))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let entry = self
            .pending
            .take()
            .ok_or_else(|| <XonError as de::Error>::custom("value requested before its key"))?;
        let name = entry.key().display();
        let at = entry.position();
        let result = match entry {
            Entry::Pair(pair) => deserialize_value(seed, &pair.value, self.options),
            Entry::Blocks(blocks) => seed.deserialize(BlocksDeserializer { blocks, options: self.options }),
        };
        result.map_err(|e| e.with_context(Some(name.as_str()), at))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// All blocks sharing one name within a parent.
struct BlocksDeserializer<'de> {
    blocks: Vec<&'de Block>,
    options: DecodeOptions,
}

impl<'de> BlocksDeserializer<'de> {
    fn single<V: Visitor<'de>>(self, visitor: &V) -> Result<BlockDeserializer<'de>> {
        match self.blocks.as_slice() {
            [block] => Ok(BlockDeserializer::block(*block, self.options)),
            _ => Err(de::Error::invalid_type(Unexpected::Other("repeated block"), visitor)),
        }
    }

    fn visit_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(BlocksAccess { blocks: self.blocks.into_iter(), options: self.options })
    }
}

impl<'de> Deserializer<'de> for BlocksDeserializer<'de> {
    type Error = XonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.blocks.len() == 1 {
            self.single(&visitor)?.deserialize_any(visitor)
        } else {
            self.visit_seq(visitor)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_seq(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.visit_seq(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.single(&visitor)?.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.single(&visitor)?.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple_struct enum identifier
    }
}

struct BlocksAccess<'de> {
    blocks: std::vec::IntoIter<&'de Block>,
    options: DecodeOptions,
}

impl<'de> SeqAccess<'de> for BlocksAccess<'de> {
    type Error = XonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        let Some(block) = self.blocks.next() else {
            return Ok(None);
        };
        seed.deserialize(BlockDeserializer::block(block, self.options))
            .map(Some)
            .map_err(|e| e.with_context(None, block.position()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.blocks.len())
    }
}

struct ListDeserializer<'de> {
    list: &'de List,
    options: DecodeOptions,
}

impl<'de> ListDeserializer<'de> {
    fn visit_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(ListAccess { items: self.list.items.iter(), options: self.options })
    }
}

impl<'de> Deserializer<'de> for ListDeserializer<'de> {
    type Error = XonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    // Derived struct visitors accept sequences, which would decode a list positionally.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        Err(de::Error::invalid_type(Unexpected::Seq, &visitor))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map enum identifier
    }
}

struct ListAccess<'de> {
    items: std::slice::Iter<'de, Value>,
    options: DecodeOptions,
}

impl<'de> SeqAccess<'de> for ListAccess<'de> {
    type Error = XonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.items.next() {
            Some(item) => deserialize_value(seed, item, self.options).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Deserializer for one string leaf. Typed targets run the leaf through
/// [`conversion`]; dynamic targets see the string itself.
struct StrDeserializer<'de> {
    s: &'de Str,
}

impl<'de> StrDeserializer<'de> {
    fn text(&self, target: &str) -> Result<&'de str> {
        let s: &'de Str = self.s;
        s.value.to_str().map_err(|_| XonError::TypeCoercion {
            key: None,
            literal: format!("\"{}\"", s.display()),
            target: target.to_string(),
            position: None,
            hint: Some("The string holds bytes that are not UTF-8; decode it as bytes instead".into()),
            code: Some(407),
        })
    }

    fn unexpected(&self) -> Unexpected<'de> {
        let s: &'de Str = self.s;
        match s.value.to_str() {
            Ok(text) => Unexpected::Str(text),
            Err(_) => Unexpected::Bytes(s.value.as_slice()),
        }
    }
}

macro_rules! deserialize_signed {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let target = stringify!($ty);
                let value = conversion::parse_signed(self.text(target)?, target, <$ty>::MIN as i128, <$ty>::MAX as i128)?;
                visitor.$visit(value as $ty)
            }
        )*
    };
}

macro_rules! deserialize_unsigned {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let target = stringify!($ty);
                let value = conversion::parse_unsigned(self.text(target)?, target, <$ty>::MAX as u128)?;
                visitor.$visit(value as $ty)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for StrDeserializer<'de> {
    type Error = XonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s: &'de Str = self.s;
        match s.value.to_str() {
            Ok(text) => visitor.visit_borrowed_str(text),
            Err(_) => visitor.visit_borrowed_bytes(s.value.as_slice()),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(conversion::parse_bool(self.text("bool")?)?)
    }

    deserialize_signed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
    }

    deserialize_unsigned! {
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(conversion::parse_f32(self.text("f32")?)?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(conversion::parse_f64(self.text("f64")?)?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_char(conversion::parse_char(self.text("char")?)?)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.text("string")?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s: &'de Str = self.s;
        visitor.visit_borrowed_bytes(s.value.as_slice())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    /// Unquoted `nil` is absent; quoted `"nil"` is the string.
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.s.is_nil() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.s.is_nil() {
            visitor.visit_unit()
        } else {
            Err(de::Error::invalid_type(self.unexpected(), &visitor))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        Err(de::Error::invalid_type(self.unexpected(), &visitor))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        Err(de::Error::invalid_type(self.unexpected(), &visitor))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    /// Only unit variants, named by the leaf.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let variant = BorrowedStrDeserializer::<XonError>::new(self.text("enum variant")?);
        visitor.visit_enum(variant)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}
