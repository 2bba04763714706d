//! 设备树节点
//!
//! 宿主内核解析设备树后，以 [`OfNode`] 的形式把节点名、`compatible` 和字符串属性交给驱动。

use alloc::{collections::btree_map::BTreeMap, string::String, vec::Vec};

/// 设备树匹配表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfDeviceId {
    /// 匹配的 compatible 字符串
    pub compatible: &'static str,
}

/// 设备树节点的属性视图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfNode {
    name: String,
    compatible: Vec<String>,
    properties: BTreeMap<String, String>,
}

impl OfNode {
    /// 创建一个节点
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            ..Self::default()
        }
    }

    /// 追加一个 compatible 字符串
    pub fn with_compatible(mut self, compatible: &str) -> Self {
        self.compatible.push(String::from(compatible));
        self
    }

    /// 设置一个字符串属性
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties
            .insert(String::from(key), String::from(value));
        self
    }

    /// 节点名（不含 unit address）
    pub fn name(&self) -> &str {
        self.name.split('@').next().unwrap_or(&self.name)
    }

    /// 节点全名
    pub fn full_name(&self) -> &str {
        &self.name
    }

    /// 读取字符串属性
    pub fn property_read_string(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 节点是否与给定 compatible 匹配
    pub fn is_compatible(&self, compatible: &str) -> bool {
        self.compatible.iter().any(|c| c == compatible)
    }

    /// 在匹配表中查找第一个匹配项
    pub fn match_table(&self, table: &[OfDeviceId]) -> Option<OfDeviceId> {
        table
            .iter()
            .find(|id| self.is_compatible(id.compatible))
            .copied()
    }
}
