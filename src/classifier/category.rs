//! 九个分类类别及其类标识符。
//! The nine classification categories and their class identifiers.

use std::fmt;

/// Whether a flow has been seen to back off under one congestion signal.
/// 流是否被观测到在某一拥塞信号下退让。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Responsiveness {
    Unclassified,
    Responsive,
    Unresponsive,
}

impl Responsiveness {
    const fn index(self) -> usize {
        match self {
            Responsiveness::Unclassified => 0,
            Responsiveness::Responsive => 1,
            Responsiveness::Unresponsive => 2,
        }
    }
}

impl fmt::Display for Responsiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Responsiveness::Unclassified => "unclassified",
            Responsiveness::Responsive => "responsive",
            Responsiveness::Unresponsive => "unresponsive",
        };
        write!(f, "{}", s)
    }
}

/// One of the nine combinations of ECN and drop responsiveness.
///
/// 九种 ECN 与丢包响应性组合之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category {
    pub ecn: Responsiveness,
    pub drop: Responsiveness,
}

impl Category {
    pub const BOTH_UNCLASSIFIED: Category =
        Category::new(Responsiveness::Unclassified, Responsiveness::Unclassified);
    pub const BOTH_RESPONSIVE: Category =
        Category::new(Responsiveness::Responsive, Responsiveness::Responsive);
    pub const BOTH_UNRESPONSIVE: Category =
        Category::new(Responsiveness::Unresponsive, Responsiveness::Unresponsive);
    pub const ECN_RESP_LOSS_UNCLASS: Category =
        Category::new(Responsiveness::Responsive, Responsiveness::Unclassified);
    pub const ECN_RESP_LOSS_UNRESP: Category =
        Category::new(Responsiveness::Responsive, Responsiveness::Unresponsive);
    pub const ECN_UNRESP_LOSS_UNCLASS: Category =
        Category::new(Responsiveness::Unresponsive, Responsiveness::Unclassified);
    pub const ECN_UNRESP_LOSS_RESP: Category =
        Category::new(Responsiveness::Unresponsive, Responsiveness::Responsive);
    pub const ECN_UNCLASS_LOSS_RESP: Category =
        Category::new(Responsiveness::Unclassified, Responsiveness::Responsive);
    pub const ECN_UNCLASS_LOSS_UNRESP: Category =
        Category::new(Responsiveness::Unclassified, Responsiveness::Unresponsive);

    pub const fn new(ecn: Responsiveness, drop: Responsiveness) -> Self {
        Self { ecn, drop }
    }

    /// Dense index in `0..9`, ECN-major.
    pub const fn index(self) -> usize {
        self.ecn.index() * 3 + self.drop.index()
    }

    pub const fn with_ecn(self, ecn: Responsiveness) -> Self {
        Self { ecn, ..self }
    }

    pub const fn with_drop(self, drop: Responsiveness) -> Self {
        Self { drop, ..self }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::BOTH_UNCLASSIFIED
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ecn={} drop={}", self.ecn, self.drop)
    }
}

/// An opaque, externally assigned class identifier.
/// 由外部分配的不透明类标识符。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assignment of a [`ClassId`] to each of the nine categories.
///
/// Lookups are total: an identifier not assigned to any category resolves to
/// [`Category::BOTH_UNCLASSIFIED`].
///
/// 为九个类别各分配一个 [`ClassId`]。查找是全函数：未分配给任何类别的标识符
/// 解析为 [`Category::BOTH_UNCLASSIFIED`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIds {
    ids: [ClassId; 9],
}

impl ClassIds {
    /// Builds the table from `(category, id)` pairs on top of the defaults.
    /// 在默认值基础上按 `(类别, 标识符)` 对构建表。
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Category, ClassId)>) -> Self {
        let mut ids = Self::default();
        for (category, id) in pairs {
            ids.ids[category.index()] = id;
        }
        ids
    }

    pub fn id(&self, category: Category) -> ClassId {
        self.ids[category.index()]
    }

    pub fn category(&self, id: ClassId) -> Category {
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|category| self.id(*category) == id)
            .unwrap_or(Category::BOTH_UNCLASSIFIED)
    }

    /// The first pair of categories that share one identifier, if any.
    /// 返回第一对共用同一标识符的类别（如果存在）。
    pub fn shared_id(&self) -> Option<(Category, Category, ClassId)> {
        ALL_CATEGORIES.iter().enumerate().find_map(|(n, first)| {
            let id = self.id(*first);
            ALL_CATEGORIES[n + 1..]
                .iter()
                .find(|second| self.id(**second) == id)
                .map(|second| (*first, *second, id))
        })
    }

    /// The identifier every new flow starts with.
    /// 每个新流的初始标识符。
    pub fn initial(&self) -> ClassId {
        self.id(Category::BOTH_UNCLASSIFIED)
    }
}

impl Default for ClassIds {
    /// `BOTH_UNCLASSIFIED` is 0; the remaining categories follow as 1..=8.
    fn default() -> Self {
        let mut ids = [ClassId(0); 9];
        let order = [
            Category::BOTH_UNCLASSIFIED,
            Category::BOTH_RESPONSIVE,
            Category::BOTH_UNRESPONSIVE,
            Category::ECN_RESP_LOSS_UNCLASS,
            Category::ECN_RESP_LOSS_UNRESP,
            Category::ECN_UNRESP_LOSS_UNCLASS,
            Category::ECN_UNRESP_LOSS_RESP,
            Category::ECN_UNCLASS_LOSS_RESP,
            Category::ECN_UNCLASS_LOSS_UNRESP,
        ];
        for (n, category) in order.iter().enumerate() {
            ids[category.index()] = ClassId(n as u32);
        }
        Self { ids }
    }
}

/// All nine categories in index order.
/// 按索引顺序排列的全部九个类别。
pub const ALL_CATEGORIES: [Category; 9] = [
    Category::BOTH_UNCLASSIFIED,
    Category::ECN_UNCLASS_LOSS_RESP,
    Category::ECN_UNCLASS_LOSS_UNRESP,
    Category::ECN_RESP_LOSS_UNCLASS,
    Category::BOTH_RESPONSIVE,
    Category::ECN_RESP_LOSS_UNRESP,
    Category::ECN_UNRESP_LOSS_UNCLASS,
    Category::ECN_UNRESP_LOSS_RESP,
    Category::BOTH_UNRESPONSIVE,
];
