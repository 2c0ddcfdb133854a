//! NCX导航元素数据结构定义
//!
//! 定义NCX文件中的元数据、导航点与导航地图。

use quick_xml::escape::escape;

/// NCX元数据信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NcxMetadata {
    /// 唯一标识符（dtb:uid）
    pub uid: Option<String>,
    /// 导航深度（dtb:depth）
    pub depth: Option<u32>,
    /// 总页数（dtb:totalPageCount）
    pub total_page_count: Option<u32>,
    /// 最大页码（dtb:maxPageNumber）
    pub max_page_number: Option<u32>,
}

/// 导航点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    /// 导航点ID
    pub id: String,
    /// 播放顺序
    pub play_order: u32,
    /// 导航标签文本
    pub label: String,
    /// 指向的文档路径（相对于NCX文件）
    pub src: String,
    /// 子导航点
    pub children: Vec<NavPoint>,
}

impl NavPoint {
    /// 创建新的导航点
    pub fn new(id: impl Into<String>, play_order: u32, label: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            play_order,
            label: label.into(),
            src: src.into(),
            children: Vec::new(),
        }
    }

    /// 添加子导航点
    pub fn add_child(&mut self, child: NavPoint) {
        self.children.push(child);
    }

    /// 获取导航点深度（包括自身）
    pub fn get_depth(&self) -> u32 {
        1 + self.children.iter().map(NavPoint::get_depth).max().unwrap_or(0)
    }

    /// 生成 `<navPoint>` 元素
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"    <navPoint id="{}" playOrder="{}">
      <navLabel><text>{}</text></navLabel>
      <content src="{}"/>"#,
            escape(&self.id),
            self.play_order,
            escape(&self.label),
            escape(&self.src)
        );
        for child in &self.children {
            xml.push('\n');
            xml.push_str(&child.to_xml());
        }
        xml.push_str("\n    </navPoint>");
        xml
    }

    fn sort_by_play_order(&mut self) {
        self.children.sort_by_key(|child| child.play_order);
        for child in &mut self.children {
            child.sort_by_play_order();
        }
    }

    fn collect<'a>(&'a self, points: &mut Vec<&'a NavPoint>) {
        points.push(self);
        for child in &self.children {
            child.collect(points);
        }
    }
}

/// 导航地图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavMap {
    /// 顶层导航点
    pub nav_points: Vec<NavPoint>,
}

impl NavMap {
    /// 创建新的导航地图
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加导航点
    pub fn add_nav_point(&mut self, nav_point: NavPoint) {
        self.nav_points.push(nav_point);
    }

    /// 按playOrder排序所有层级的导航点
    pub fn sort_by_play_order(&mut self) {
        self.nav_points.sort_by_key(|point| point.play_order);
        for point in &mut self.nav_points {
            point.sort_by_play_order();
        }
    }

    /// 获取导航地图的最大深度
    pub fn get_depth(&self) -> u32 {
        self.nav_points.iter().map(NavPoint::get_depth).max().unwrap_or(0)
    }

    /// 获取所有导航点的平铺列表（深度优先）
    pub fn get_all_nav_points(&self) -> Vec<&NavPoint> {
        let mut points = Vec::new();
        for point in &self.nav_points {
            point.collect(&mut points);
        }
        points
    }

    /// 根据ID查找导航点
    pub fn find_nav_point_by_id(&self, id: &str) -> Option<&NavPoint> {
        self.get_all_nav_points().into_iter().find(|point| point.id == id)
    }
}
