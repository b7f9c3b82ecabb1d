//! Demonstration of a store managing a todo list

use std::sync::Arc;

use honeypot::{create_store, merge_state, Recipe, StoreBuilder};

#[derive(Clone, Debug, PartialEq)]
struct TodoItem {
    id: usize,
    title: String,
    completed: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

merge_state! {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct AppState => AppPatch {
        todos: Arc<Vec<TodoItem>>,
        filter: TodoFilter,
    }
}

impl AppState {
    fn add_todo(&mut self, title: &str) {
        let todos = Arc::make_mut(&mut self.todos);
        let id = todos.len();
        todos.push(TodoItem {
            id,
            title: title.to_string(),
            completed: false,
        });
    }

    fn toggle_todo(&mut self, id: usize) {
        if let Some(todo) = Arc::make_mut(&mut self.todos).iter_mut().find(|t| t.id == id) {
            todo.completed = !todo.completed;
        }
    }

    fn filtered_todos(&self) -> Vec<&TodoItem> {
        match self.filter {
            TodoFilter::All => self.todos.iter().collect(),
            TodoFilter::Active => self.todos.iter().filter(|t| !t.completed).collect(),
            TodoFilter::Completed => self.todos.iter().filter(|t| t.completed).collect(),
        }
    }

    fn stats(&self) -> (usize, usize, usize) {
        let total = self.todos.len();
        let completed = self.todos.iter().filter(|t| t.completed).count();
        let active = total - completed;
        (total, active, completed)
    }
}

fn print_todos(state: &AppState) {
    for todo in state.filtered_todos() {
        let status = if todo.completed { "✓" } else { " " };
        println!("   [{}] {}", status, todo.title);
    }
}

fn main() {
    println!("=== Store Example: Todo App ===\n");

    // Create store with initial state
    let store = StoreBuilder::new()
        .name("todos")
        .build(|_, _, _| AppState::default());

    // Subscribe to state changes
    println!("1. Setting up subscriber");
    let subscription = store.subscribe(|state: &AppState, previous: &AppState| {
        let (total, active, completed) = state.stats();
        let list_changed = !Arc::ptr_eq(&state.todos, &previous.todos);
        println!(
            "   [Store Update] Total: {}, Active: {}, Completed: {} (list changed: {})",
            total, active, completed, list_changed
        );
    });

    // Add todos
    println!("\n2. Adding todos");
    for title in ["Learn Rust", "Build a state container", "Write documentation"] {
        store.set_state(Recipe::mutate(move |state: &mut AppState| state.add_todo(title)), false);
    }

    // Display current todos
    println!("\n3. Current todos:");
    print_todos(&store.get_state());

    // Complete a todo
    println!("\n4. Completing first todo");
    store.set_state(Recipe::mutate(|state: &mut AppState| state.toggle_todo(0)), false);

    // Change filter; the todo list itself is shared with the previous state
    println!("\n5. Filtering to show only active todos");
    store.set_state(
        Recipe::partial(AppPatch {
            filter: Some(TodoFilter::Active),
            ..Default::default()
        }),
        false,
    );
    print_todos(&store.get_state());

    // Show completed
    println!("\n6. Filtering to show completed todos");
    store.set_state(
        Recipe::partial(AppPatch {
            filter: Some(TodoFilter::Completed),
            ..Default::default()
        }),
        false,
    );
    print_todos(&store.get_state());

    // Stop listening, then reset to the initial state
    println!("\n7. Unsubscribing and resetting");
    subscription.unsubscribe();
    store.set_state(Recipe::from(store.get_initial_state()), true);

    let (total, active, completed) = store.get_state().stats();
    println!("   Total: {}", total);
    println!("   Active: {}", active);
    println!("   Completed: {}", completed);

    // A throwaway store for comparison
    let scratch = create_store(|_, _, _| 0_u32);
    scratch.set_state(Recipe::value(1), false);
    println!("\n8. Scratch store holds {}", scratch.get_state());

    println!("\n✓ Example complete!");
}
