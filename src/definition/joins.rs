//! Join resolution: the minimal, root-first ordered relation set reaching every used table.

use super::{Definition, RelationId, TableId};
use std::collections::{HashMap, HashSet};

impl Definition {
    /// Relations needed to connect the root to every table in `used`, ordered by depth
    /// (ties in discovery order) so no join references a table not yet joined.
    pub fn required_relations(&self, used: &HashSet<TableId>) -> Vec<RelationId> {
        let mut depth_by_relation: HashMap<RelationId, usize> = HashMap::new();
        let mut discovered: Vec<RelationId> = Vec::new();
        let mut path: Vec<RelationId> = Vec::new();
        self.walk_relations(self.root(), used, &mut path, &mut depth_by_relation, &mut discovered);

        discovered.sort_by_key(|r| depth_by_relation[r]);
        discovered
    }

    fn walk_relations(
        &self,
        table: TableId,
        used: &HashSet<TableId>,
        path: &mut Vec<RelationId>,
        depth_by_relation: &mut HashMap<RelationId, usize>,
        discovered: &mut Vec<RelationId>,
    ) {
        for relation_id in &self.table(table).relations {
            let relation = self.relation(*relation_id);
            path.push(*relation_id);

            if used.contains(&relation.child) {
                for (depth, on_path) in path.iter().enumerate() {
                    match depth_by_relation.get_mut(on_path) {
                        Some(known) => *known = (*known).min(depth),
                        None => {
                            depth_by_relation.insert(*on_path, depth);
                            discovered.push(*on_path);
                        }
                    }
                }
            }

            self.walk_relations(relation.child, used, path, depth_by_relation, discovered);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Relation, Table};

    // product -> category -> section
    //         -> brand
    fn catalog() -> Definition {
        let section = Table::new("section").field(Field::new("id"));
        let category = Table::new("category")
            .field(Field::new("id"))
            .field(Field::new("section_id"))
            .relation(Relation::new("section_id", "id", section));
        let brand = Table::new("brand").field(Field::new("id"));
        let product = Table::new("product")
            .field(Field::new("category_id"))
            .field(Field::new("brand_id"))
            .relation(Relation::new("category_id", "id", category))
            .relation(Relation::new("brand_id", "id", brand));
        Definition::build(&product).unwrap()
    }

    fn used(def: &Definition, refs: &[&str]) -> HashSet<TableId> {
        refs.iter().map(|r| def.table_by_ref(r).unwrap()).collect()
    }

    fn children(def: &Definition, relations: &[RelationId]) -> Vec<String> {
        relations
            .iter()
            .map(|r| def.table(def.relation(*r).child).name.clone())
            .collect()
    }

    #[test]
    fn nothing_used_joins_nothing() {
        let def = catalog();
        assert!(def.required_relations(&HashSet::new()).is_empty());
        assert!(def.required_relations(&used(&def, &["product"])).is_empty());
    }

    #[test]
    fn deep_table_pulls_its_whole_path_parent_first() {
        let def = catalog();
        let relations = def.required_relations(&used(&def, &["section"]));
        assert_eq!(children(&def, &relations), vec!["category", "section"]);
    }

    #[test]
    fn unrelated_branches_are_not_joined() {
        let def = catalog();
        let relations = def.required_relations(&used(&def, &["brand"]));
        assert_eq!(children(&def, &relations), vec!["brand"]);
    }

    #[test]
    fn orders_by_depth_then_discovery() {
        let def = catalog();
        let relations = def.required_relations(&used(&def, &["section", "brand", "category"]));
        assert_eq!(children(&def, &relations), vec!["category", "brand", "section"]);
    }
}
